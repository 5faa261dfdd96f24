use deepcopy_cli::models::{Entry, EntryId, FieldValue, Fields, Link, LinkType};
use deepcopy_cli::pipeline::CloneMap;
use deepcopy_cli::pipeline::rewrite::relink;
use deepcopy_cli::test_utils::EntryBuilder;
use serde_json::json;

fn clones() -> CloneMap {
    let mut map = CloneMap::new();
    for (original, clone) in [("a", "a2"), ("b", "b2"), ("c", "c2")] {
        map.insert(EntryId::new(original), Entry::new(clone, "contentModule", Fields::new()));
    }
    map
}

/// Links inside nested lists are rewritten in place
#[test]
fn test_relink_nested_lists() {
    let nested = FieldValue::List(vec![
        FieldValue::Link(Link::entry("a")),
        FieldValue::List(vec![FieldValue::Link(Link::entry("b")), FieldValue::text("plain")]),
    ]);
    let mut fields = EntryBuilder::new("x", "toolkit").field("grid", nested).build().fields;

    assert_eq!(relink(&mut fields, &clones()), 2);
    assert_eq!(
        fields.localized("grid", "en-US"),
        Some(&FieldValue::List(vec![
            FieldValue::Link(Link::entry("a2")),
            FieldValue::List(vec![FieldValue::Link(Link::entry("b2")), FieldValue::text("plain")]),
        ]))
    );
}

/// Every locale of a field is relinked
#[test]
fn test_relink_all_locales() {
    let mut fields = EntryBuilder::new("x", "toolkit")
        .link("hero", "a")
        .locale("de-DE")
        .link("hero", "c")
        .build()
        .fields;

    assert_eq!(relink(&mut fields, &clones()), 2);
    assert_eq!(fields.localized("hero", "en-US"), Some(&FieldValue::Link(Link::entry("a2"))));
    assert_eq!(fields.localized("hero", "de-DE"), Some(&FieldValue::Link(Link::entry("c2"))));
}

/// Links to shared or unknown entries stay as they are
#[test]
fn test_relink_leaves_uncloned_targets() {
    let mut fields = EntryBuilder::new("x", "toolkit")
        .links("regions", ["tag-emea", "a"])
        .asset("art", "a")
        .build()
        .fields;

    assert_eq!(relink(&mut fields, &clones()), 1);
    assert_eq!(
        fields.localized("regions", "en-US"),
        Some(&FieldValue::List(vec![
            FieldValue::Link(Link::entry("tag-emea")),
            FieldValue::Link(Link::entry("a2")),
        ]))
    );
    assert_eq!(
        fields.localized("art", "en-US").and_then(|value| match value {
            FieldValue::Link(link) => Some(link.link_type.clone()),
            _ => None,
        }),
        Some(LinkType::Asset)
    );
}

/// Links embedded in rich text are scalar content and are not followed
#[test]
fn test_relink_ignores_links_inside_scalars() {
    let rich_text = json!({
        "nodeType": "document",
        "content": [{"data": {"target": {"sys": {"type": "Link", "linkType": "Entry", "id": "a"}}}}]
    });
    let mut fields = Fields::new();
    fields.set_localized("body", "en-US", FieldValue::Scalar(rich_text.clone()));

    assert_eq!(relink(&mut fields, &clones()), 0);
    assert_eq!(fields.localized("body", "en-US"), Some(&FieldValue::Scalar(rich_text)));
}

/// Wire JSON round trips through relinking
#[test]
fn test_relink_wire_fields() {
    let mut fields: Fields = serde_json::from_value(json!({
        "title": {"en-US": "Summer"},
        "modules": {"en-US": [
            {"sys": {"type": "Link", "linkType": "Entry", "id": "b"}},
            {"sys": {"type": "Link", "linkType": "Entry", "id": "z"}}
        ]}
    }))
    .unwrap();

    relink(&mut fields, &clones());

    assert_eq!(
        serde_json::to_value(&fields).unwrap(),
        json!({
            "title": {"en-US": "Summer"},
            "modules": {"en-US": [
                {"sys": {"type": "Link", "linkType": "Entry", "id": "b2"}},
                {"sys": {"type": "Link", "linkType": "Entry", "id": "z"}}
            ]}
        })
    );
}
