use deepcopy_cli::models::{Entry, FieldValue, Fields};
use deepcopy_cli::rules::{RuleContext, RuleRegistry, StripRule, TitleSpec};
use deepcopy_cli::test_utils::{EntryBuilder, sample_toolkit};

fn toolkit() -> Entry {
    sample_toolkit().into_iter().find(|entry| entry.content_type == "toolkit").unwrap()
}

/// Every content type of a toolkit tree has a rule
#[test]
fn test_builtin_registry_covers_toolkit_tree() {
    let registry = RuleRegistry::builtin();
    for entry in sample_toolkit() {
        assert!(registry.contains(&entry.content_type), "no rule for {}", entry.content_type);
    }
    assert_eq!(
        registry.content_types(),
        vec![
            "contentModule",
            "imageMetadata",
            "tagCreativeType",
            "tagLanguage",
            "tagRegion",
            "toolkit",
            "toolkitAsset"
        ]
    );
}

/// Replacing the title resets description and synopsis
#[test]
fn test_toolkit_replace_title() {
    let outcome = RuleRegistry::builtin()
        .apply(&toolkit(), &RuleContext::with_title(TitleSpec::Replace("Autumn".into())))
        .unwrap();

    let fields = &outcome.fields;
    assert_eq!(fields.text("title", "en-US"), Some("Autumn"));
    assert_eq!(fields.text("description", "en-US"), Some("Description"));
    assert_eq!(fields.text("synopsis", "en-US"), Some("Synopsis"));
    for stripped in ["slug", "launchDate", "titleArt", "sendForLocalization"] {
        assert!(!fields.contains(stripped), "{stripped} should be stripped");
    }
    // links survive for relinking
    assert!(fields.contains("modules"));
    assert_eq!(outcome.label.as_deref(), Some("Autumn"));
}

/// A tag keeps the title, description and synopsis
#[test]
fn test_toolkit_suffix_title() {
    let outcome = RuleRegistry::builtin()
        .apply(&toolkit(), &RuleContext::with_title(TitleSpec::Suffix("(copy)".into())))
        .unwrap();

    assert_eq!(outcome.fields.text("title", "en-US"), Some("Summer Launch (copy)"));
    assert_eq!(outcome.fields.text("description", "en-US"), Some("Everything for the summer launch"));
    assert_eq!(outcome.fields.text("synopsis", "en-US"), Some("Summer"));
}

/// Only the presentation locale is overwritten
#[test]
fn test_replace_title_leaves_other_locales() {
    let entry = EntryBuilder::new("t", "toolkit")
        .text("title", "Summer")
        .text("description", "For summer")
        .locale("de-DE")
        .text("title", "Sommer")
        .text("description", "Für den Sommer")
        .build();

    let outcome = RuleRegistry::builtin()
        .apply(&entry, &RuleContext::with_title(TitleSpec::Replace("Autumn".into())))
        .unwrap();

    assert_eq!(outcome.fields.text("title", "en-US"), Some("Autumn"));
    assert_eq!(outcome.fields.text("title", "de-DE"), Some("Sommer"));
    assert_eq!(outcome.fields.text("description", "en-US"), Some("Description"));
    assert_eq!(outcome.fields.text("description", "de-DE"), Some("Für den Sommer"));
}

/// Tags are traversed but never copied, and keep their fields
#[test]
fn test_tags_are_skip_copy() {
    let registry = RuleRegistry::builtin();
    for content_type in ["tagRegion", "tagLanguage", "tagCreativeType"] {
        let entry = EntryBuilder::new("t", content_type)
            .text("name", "EMEA")
            .text("localizedDate", "2021-01-01")
            .build();
        let outcome = registry.apply(&entry, &RuleContext::default()).unwrap();
        assert!(outcome.skip_copy, "{content_type} should be skip-copy");
        assert!(outcome.fields.contains("localizedDate"));
    }
}

/// Rules never see other entries
#[test]
fn test_rules_are_pure() {
    let registry = RuleRegistry::builtin();
    let entry = toolkit();
    let first = registry.apply(&entry, &RuleContext::default()).unwrap();
    let second = registry.apply(&entry, &RuleContext::default()).unwrap();
    assert_eq!(first, second);
    assert_eq!(entry, toolkit());
}

/// A registered rule replaces the built-in one
#[test]
fn test_register_replaces_builtin() {
    let mut registry = RuleRegistry::builtin();
    let replaced = registry.register("imageMetadata", StripRule::new().strip(["name"]));
    assert!(replaced.is_some());

    let entry = EntryBuilder::new("i", "imageMetadata").text("name", "banner.png").build();
    let outcome = registry.apply(&entry, &RuleContext::default()).unwrap();
    assert!(!outcome.fields.contains("name"));
    assert_eq!(outcome.label, Some("i".to_string()));
}

#[test]
fn test_unknown_type_has_no_rule() {
    let registry = RuleRegistry::builtin();
    let entry = Entry::new("x", "landingPage", Fields::new());
    assert!(registry.apply(&entry, &RuleContext::default()).is_none());
    assert_eq!(registry.suggest("toolkits"), Some("toolkit"));
    assert_eq!(registry.suggest("tagregion"), Some("tagRegion"));
}

#[test]
fn test_passthrough_applies_cleanup_only() {
    let entry = EntryBuilder::new("x", "landingPage")
        .text("slug", "kept")
        .field("localizedVersion", FieldValue::text("3"))
        .build();
    let outcome = RuleRegistry::builtin().passthrough(&entry, false);
    assert!(outcome.fields.contains("slug"));
    assert!(!outcome.fields.contains("localizedVersion"));
}
