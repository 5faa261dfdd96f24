use std::time::Duration;

use deepcopy_cli::client::{ClientError, CmsClient, HttpClientConfig, HttpCmsClient};
use deepcopy_cli::models::{Entry, EntryId, FieldValue, Fields, Link};
use deepcopy_cli::pipeline::Cloner;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const ENTRIES: &str = "/spaces/space-1/environments/master/entries";

fn client_for(server: &MockServer) -> HttpCmsClient {
    HttpCmsClient::new(HttpClientConfig {
        base_url: server.uri(),
        space_id: "space-1".to_string(),
        access_token: "test-token".to_string(),
        request_delay: Duration::ZERO,
        max_retries: 2,
        timeout: Duration::from_secs(5),
        ..HttpClientConfig::default()
    })
    .unwrap()
}

fn entry_json(id: &str, content_type: &str, version: u64, fields: Value) -> Value {
    json!({
        "sys": {
            "id": id,
            "type": "Entry",
            "version": version,
            "contentType": {"sys": {"type": "Link", "linkType": "ContentType", "id": content_type}}
        },
        "fields": fields
    })
}

/// Responds like the CMS to a write: the posted fields come back under a new version.
fn echo_fields(
    id: &'static str,
    content_type: &'static str,
    status: u16,
    version: u64,
) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync + 'static {
    move |request: &Request| {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or_default();
        ResponseTemplate::new(status)
            .set_body_json(entry_json(id, content_type, version, body["fields"].clone()))
    }
}

fn link(id: &str) -> Value {
    json!({"sys": {"type": "Link", "linkType": "Entry", "id": id}})
}

/// Entries are read with their content type, version and links
#[tokio::test]
async fn test_fetch_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{ENTRIES}/root")))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(entry_json(
            "root",
            "toolkit",
            7,
            json!({
                "title": {"en-US": "Summer"},
                "modules": {"en-US": [link("m1")]}
            }),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let entry = client_for(&server).fetch_entry(&EntryId::new("root")).await.unwrap();

    assert_eq!(entry.content_type, "toolkit");
    assert_eq!(entry.version, Some(7));
    assert_eq!(entry.fields.text("title", "en-US"), Some("Summer"));
    assert_eq!(entry.fields.entry_link_targets(), vec![EntryId::new("m1")]);
}

#[tokio::test]
async fn test_fetch_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{ENTRIES}/ghost")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "sys": {"type": "Error", "id": "NotFound"},
            "message": "The resource could not be found."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let error = client_for(&server).fetch_entry(&EntryId::new("ghost")).await.unwrap_err();

    assert_eq!(
        error,
        ClientError::NotFound {
            id: EntryId::new("ghost")
        }
    );
}

/// Rate-limited reads are retried
#[tokio::test]
async fn test_fetch_retries_after_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{ENTRIES}/root")))
        .respond_with(
            ResponseTemplate::new(429).insert_header("X-Contentful-RateLimit-Reset", "1"),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{ENTRIES}/root")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(entry_json("root", "toolkit", 1, json!({}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let entry = client_for(&server).fetch_entry(&EntryId::new("root")).await.unwrap();
    assert_eq!(entry.id, EntryId::new("root"));
}

/// Retries give up after the configured count
#[tokio::test]
async fn test_fetch_gives_up_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{ENTRIES}/root")))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let error = client_for(&server).fetch_entry(&EntryId::new("root")).await.unwrap_err();
    assert!(matches!(error, ClientError::Network { .. }));
}

/// Creation sends the content type header and the wire fields
#[tokio::test]
async fn test_create_entry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENTRIES))
        .and(header("X-Contentful-Content-Type", "toolkitAsset"))
        .and(body_partial_json(json!({"fields": {"owner": {"en-US": link("root")}}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(entry_json(
            "new-1",
            "toolkitAsset",
            1,
            json!({"owner": {"en-US": link("root")}}),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let mut fields = Fields::new();
    fields.set_localized("owner", "en-US", FieldValue::Link(Link::entry("root")));
    let created = client_for(&server).create_entry("toolkitAsset", fields).await.unwrap();

    assert_eq!(created.id, EntryId::new("new-1"));
    assert_eq!(created.version, Some(1));
}

/// Creation is not retried on server errors
#[tokio::test]
async fn test_create_not_retried_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENTRIES))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let error = client_for(&server).create_entry("toolkit", Fields::new()).await.unwrap_err();
    assert!(matches!(error, ClientError::Network { .. }));
}

#[tokio::test]
async fn test_create_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENTRIES))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "sys": {"type": "Error", "id": "ValidationFailed"},
            "message": "Validation error",
            "details": {"errors": [{"name": "required", "path": ["fields", "slug"]}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let error = client_for(&server).create_entry("toolkit", Fields::new()).await.unwrap_err();

    let ClientError::Validation {
        content_type,
        reason,
    } = error
    else {
        panic!("expected validation error, got {error:?}");
    };
    assert_eq!(content_type, "toolkit");
    assert!(reason.contains("Validation error"));
    assert!(reason.contains("slug"));
}

/// Updates carry the version they were read at
#[tokio::test]
async fn test_update_sends_version() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{ENTRIES}/new-1")))
        .and(header("X-Contentful-Version", "4"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(entry_json("new-1", "toolkit", 5, json!({}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut entry = Entry::new("new-1", "toolkit", Fields::new());
    entry.version = Some(4);
    let updated = client_for(&server).update_entry(entry).await.unwrap();

    assert_eq!(updated.version, Some(5));
}

#[tokio::test]
async fn test_update_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{ENTRIES}/new-1")))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "sys": {"type": "Error", "id": "VersionMismatch"},
            "message": "Version mismatch"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut entry = Entry::new("new-1", "toolkit", Fields::new());
    entry.version = Some(1);
    let error = client_for(&server).update_entry(entry).await.unwrap_err();

    assert!(matches!(error, ClientError::Conflict { ref reason, .. } if reason.contains("Version mismatch")));
}

/// A full clone over HTTP: root and one module
#[tokio::test]
async fn test_clone_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{ENTRIES}/root")))
        .respond_with(ResponseTemplate::new(200).set_body_json(entry_json(
            "root",
            "toolkit",
            3,
            json!({"title": {"en-US": "Summer"}, "modules": {"en-US": [link("m1")]}}),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{ENTRIES}/m1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(entry_json(
            "m1",
            "contentModule",
            2,
            json!({"contentType": {"en-US": "Hero"}, "toolkit": {"en-US": link("root")}}),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENTRIES))
        .and(header("X-Contentful-Content-Type", "toolkit"))
        .respond_with(echo_fields("root-copy", "toolkit", 201, 1))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENTRIES))
        .and(header("X-Contentful-Content-Type", "contentModule"))
        .respond_with(echo_fields("m1-copy", "contentModule", 201, 1))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{ENTRIES}/root-copy")))
        .and(body_partial_json(json!({"fields": {"modules": {"en-US": [link("m1-copy")]}}})))
        .respond_with(echo_fields("root-copy", "toolkit", 200, 2))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{ENTRIES}/m1-copy")))
        .and(body_partial_json(json!({"fields": {"toolkit": {"en-US": link("root-copy")}}})))
        .respond_with(echo_fields("m1-copy", "contentModule", 200, 2))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let report = Cloner::new(&client).run(&EntryId::new("root")).await.unwrap();

    assert_eq!(report.root.id, EntryId::new("root-copy"));
    assert_eq!(report.root.version, Some(2));
    assert_eq!(report.created, 2);
    assert_eq!(report.root.fields.text("title", "en-US"), Some("New Toolkit"));
    assert_eq!(report.root.fields.entry_link_targets(), vec![EntryId::new("m1-copy")]);
}
