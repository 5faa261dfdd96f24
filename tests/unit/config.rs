use deepcopy_cli::config::DeepcopyConfig;
use deepcopy_cli::core::CloneError;
use deepcopy_cli::models::Entry;
use deepcopy_cli::rules::{RuleContext, TitleSpec, UnrecognizedPolicy};
use deepcopy_cli::test_utils::EntryBuilder;
use std::time::Duration;
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
[cms]
base_url = "https://cms.example.com"
space_id = "space-1"
environment = "staging"
access_token = "CFPAT-file-token"
request_delay_ms = 250
max_retries = 2
timeout_secs = 10

[clone]
locale = "de-DE"
default_title = "Neues Toolkit"
unrecognized = "reject"
max_concurrency = 8
progress_every = 5

[rules.landingPage]
strip = ["slug", "heroBanner"]
label_field = "internalName"

[rules.tagAudience]
skip_copy = true
"#;

async fn load(content: &str) -> DeepcopyConfig {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, content).unwrap();
    DeepcopyConfig::load_with_optional(Some(path)).await.unwrap()
}

/// Every section of the file is honored
#[tokio::test]
async fn test_full_config_file() {
    let config = load(FULL_CONFIG).await;

    let http = config.http_config_with_token(None).unwrap();
    assert_eq!(http.base_url, "https://cms.example.com");
    assert_eq!(http.space_id, "space-1");
    assert_eq!(http.environment, "staging");
    assert_eq!(http.access_token, "CFPAT-file-token");
    assert_eq!(http.request_delay, Duration::from_millis(250));
    assert_eq!(http.max_retries, 2);
    assert_eq!(http.timeout, Duration::from_secs(10));

    let options = config.clone_options();
    assert_eq!(options.locale, "de-DE");
    assert_eq!(options.title, TitleSpec::Replace("Neues Toolkit".to_string()));
    assert_eq!(options.unrecognized, UnrecognizedPolicy::Reject);
    assert_eq!(options.max_concurrency, 8);
    assert_eq!(options.progress_every, 5);
}

/// Declared rules behave like built-in ones
#[tokio::test]
async fn test_config_rules_apply() {
    let config = load(FULL_CONFIG).await;
    let registry = config.registry();
    let ctx = RuleContext {
        locale: "de-DE".to_string(),
        ..RuleContext::default()
    };

    let page: Entry = EntryBuilder::new("lp", "landingPage")
        .locale("de-DE")
        .text("internalName", "Startseite")
        .text("slug", "start")
        .text("body", "Hallo")
        .build();
    let outcome = registry.apply(&page, &ctx).unwrap();
    assert!(!outcome.skip_copy);
    assert!(!outcome.fields.contains("slug"));
    assert!(outcome.fields.contains("body"));
    assert_eq!(outcome.label.as_deref(), Some("Startseite"));

    let audience = EntryBuilder::new("aud", "tagAudience").build();
    assert!(registry.apply(&audience, &ctx).unwrap().skip_copy);

    // built-ins are still there
    assert!(registry.contains("toolkit"));
}

/// Zero concurrency in the file is clamped
#[tokio::test]
async fn test_zero_concurrency_is_clamped() {
    let config = load("[clone]\nmax_concurrency = 0\n").await;
    assert_eq!(config.clone_options().max_concurrency, 1);
}

#[tokio::test]
async fn test_unknown_policy_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "[clone]\nunrecognized = \"ignore\"\n").unwrap();

    let error = DeepcopyConfig::load_from(&path).await.unwrap_err();
    assert!(format!("{error:#}").contains("Failed to parse config"));
}

#[test]
fn test_example_config_is_not_usable_as_is() {
    let error = DeepcopyConfig::init_example().http_config_with_token(None).unwrap_err();
    assert!(matches!(error, CloneError::Config { .. }));
}
