//! Content Management API client over HTTP.
//!
//! Speaks the Contentful-style management API:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | fetch     | `GET  {base}/spaces/{space}/environments/{env}/entries/{id}` |
//! | create    | `POST {base}/spaces/{space}/environments/{env}/entries` + `X-Contentful-Content-Type` |
//! | update    | `PUT  {base}/spaces/{space}/environments/{env}/entries/{id}` + `X-Contentful-Version` |
//!
//! # Retry Strategy
//!
//! Transient failures are retried with exponential backoff (`tokio-retry`):
//!
//! - Delays: 200ms, 400ms, 800ms... with jitter, capped at 8s
//! - Attempts: `max_retries` retries after the first try
//! - Fetches and updates retry on network errors and rate limiting
//! - Creations retry only on rate limiting, since a dropped response may
//!   still have created the entry
//!
//! Every attempt is preceded by a fixed pacing delay (`request_delay`) to stay
//! under the API's per-second limit on large clones.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

use super::{ClientError, CmsClient};
use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_ENVIRONMENT, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_DELAY_MS,
    DEFAULT_TIMEOUT_SECS, MAX_RETRY_DELAY, RETRY_BASE, RETRY_FACTOR_MS,
};
use crate::models::{Entry, EntryId, Fields};

const MANAGEMENT_MEDIA_TYPE: &str = "application/vnd.contentful.management.v1+json";
const CONTENT_TYPE_HEADER: &str = "X-Contentful-Content-Type";
const VERSION_HEADER: &str = "X-Contentful-Version";
const RATE_LIMIT_RESET_HEADER: &str = "X-Contentful-RateLimit-Reset";

/// Connection settings for [`HttpCmsClient`].
#[derive(Clone)]
pub struct HttpClientConfig {
    /// API host, e.g. `https://api.contentful.com`
    pub base_url: String,
    /// Space holding the entries
    pub space_id: String,
    /// Environment within the space
    pub environment: String,
    /// Management API token
    pub access_token: String,
    /// Pause before each request
    pub request_delay: Duration,
    /// Retries for transient failures
    pub max_retries: usize,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            space_id: String::new(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            access_token: String::new(),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for HttpClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClientConfig")
            .field("base_url", &self.base_url)
            .field("space_id", &self.space_id)
            .field("environment", &self.environment)
            .field("access_token", &"***")
            .field("request_delay", &self.request_delay)
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// [`CmsClient`] backed by the management HTTP API.
#[derive(Clone)]
pub struct HttpCmsClient {
    http: reqwest::Client,
    entries_url: String,
    access_token: String,
    request_delay: Duration,
    max_retries: usize,
}

impl fmt::Debug for HttpCmsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCmsClient")
            .field("entries_url", &self.entries_url)
            .field("request_delay", &self.request_delay)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct EntryBody<'a> {
    fields: &'a Fields,
}

#[derive(Deserialize)]
struct WireEntry {
    sys: WireSys,
    #[serde(default)]
    fields: Fields,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSys {
    id: EntryId,
    #[serde(default)]
    version: Option<u64>,
    #[serde(default)]
    content_type: Option<WireLink>,
}

#[derive(Deserialize)]
struct WireLink {
    sys: WireLinkSys,
}

#[derive(Deserialize)]
struct WireLinkSys {
    id: String,
}

#[derive(Deserialize)]
struct WireError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

impl WireEntry {
    fn into_entry(self, fallback_type: Option<&str>) -> Option<Entry> {
        let content_type = self
            .sys
            .content_type
            .map(|link| link.sys.id)
            .or_else(|| fallback_type.map(str::to_string))?;
        Some(Entry {
            id: self.sys.id,
            content_type,
            version: self.sys.version,
            fields: self.fields,
        })
    }
}

impl HttpCmsClient {
    /// Build a client for one space/environment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Network`] if the HTTP client cannot be constructed
    /// (e.g. TLS backend initialisation fails).
    pub fn new(config: HttpClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("deepcopy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Network {
                operation: "client setup".to_string(),
                reason: e.to_string(),
            })?;

        let entries_url = format!(
            "{}/spaces/{}/environments/{}/entries",
            config.base_url.trim_end_matches('/'),
            config.space_id,
            config.environment
        );

        Ok(Self {
            http,
            entries_url,
            access_token: config.access_token,
            request_delay: config.request_delay,
            max_retries: config.max_retries,
        })
    }

    fn entry_url(&self, id: &EntryId) -> String {
        format!("{}/{}", self.entries_url, id)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, MANAGEMENT_MEDIA_TYPE)
    }

    /// Run `attempt` with pacing and retries.
    ///
    /// `idempotent` operations retry on any transient error; the rest only
    /// retry when the CMS explicitly refused the request (rate limiting).
    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        idempotent: bool,
        mut attempt: F,
    ) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let strategy = ExponentialBackoff::from_millis(RETRY_BASE)
            .factor(RETRY_FACTOR_MS)
            .max_delay(MAX_RETRY_DELAY)
            .map(jitter)
            .take(self.max_retries);
        let delay = self.request_delay;

        RetryIf::spawn(
            strategy,
            || {
                let pending = attempt();
                async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    pending.await
                }
            },
            |error: &ClientError| {
                let retry = if idempotent {
                    error.is_transient()
                } else {
                    matches!(error, ClientError::RateLimited { .. })
                };
                if retry {
                    tracing::debug!(target: "client", "Retrying {operation} after: {error}");
                }
                retry
            },
        )
        .await
    }
}

impl CmsClient for HttpCmsClient {
    async fn fetch_entry(&self, id: &EntryId) -> Result<Entry, ClientError> {
        let url = self.entry_url(id);
        tracing::debug!(target: "client", "GET {url}");

        self.with_retry("fetch entry", true, || {
            let request = self.request(Method::GET, &url);
            async move {
                let response =
                    request.send().await.map_err(|e| transport_error("fetch entry", &e))?;
                let response = check_status(response, "fetch entry", Some(id), None).await?;
                read_entry(response, "fetch entry", None).await
            }
        })
        .await
    }

    async fn create_entry(&self, content_type: &str, fields: Fields) -> Result<Entry, ClientError> {
        tracing::debug!(target: "client", "POST {} ({content_type})", self.entries_url);

        self.with_retry("create entry", false, || {
            let request = self
                .request(Method::POST, &self.entries_url)
                .header(CONTENT_TYPE_HEADER, content_type)
                .json(&EntryBody {
                    fields: &fields,
                });
            async move {
                let response =
                    request.send().await.map_err(|e| transport_error("create entry", &e))?;
                let response =
                    check_status(response, "create entry", None, Some(content_type)).await?;
                read_entry(response, "create entry", Some(content_type)).await
            }
        })
        .await
    }

    async fn update_entry(&self, entry: Entry) -> Result<Entry, ClientError> {
        let url = self.entry_url(&entry.id);
        tracing::debug!(target: "client", "PUT {url} (version {:?})", entry.version);
        let entry = &entry;

        self.with_retry("update entry", true, || {
            let mut request = self.request(Method::PUT, &url).json(&EntryBody {
                fields: &entry.fields,
            });
            if let Some(version) = entry.version {
                request = request.header(VERSION_HEADER, version.to_string());
            }
            async move {
                let response =
                    request.send().await.map_err(|e| transport_error("update entry", &e))?;
                let response = check_status(
                    response,
                    "update entry",
                    Some(&entry.id),
                    Some(&entry.content_type),
                )
                .await?;
                read_entry(response, "update entry", Some(&entry.content_type)).await
            }
        })
        .await
    }
}

fn transport_error(operation: &str, error: &reqwest::Error) -> ClientError {
    let reason = if error.is_timeout() {
        format!("request timed out: {error}")
    } else {
        error.to_string()
    };
    ClientError::Network {
        operation: operation.to_string(),
        reason,
    }
}

async fn check_status(
    response: Response,
    operation: &str,
    id: Option<&EntryId>,
    content_type: Option<&str>,
) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after_secs = response
        .headers()
        .get(RATE_LIMIT_RESET_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(1);
    let body = response.text().await.unwrap_or_default();

    Err(status_error(status.as_u16(), &body, operation, id, content_type, retry_after_secs))
}

/// Map a non-success HTTP status to a [`ClientError`].
fn status_error(
    status: u16,
    body: &str,
    operation: &str,
    id: Option<&EntryId>,
    content_type: Option<&str>,
    retry_after_secs: u64,
) -> ClientError {
    let reason = error_reason(body).unwrap_or_else(|| format!("HTTP {status}"));

    match (status, id) {
        (404, Some(id)) => ClientError::NotFound {
            id: id.clone(),
        },
        (409, Some(id)) => ClientError::Conflict {
            id: id.clone(),
            reason,
        },
        (400 | 422, _) => ClientError::Validation {
            content_type: content_type.unwrap_or("unknown").to_string(),
            reason,
        },
        (429, _) => ClientError::RateLimited {
            retry_after_secs,
        },
        _ => ClientError::Network {
            operation: operation.to_string(),
            reason: format!("HTTP {status}: {reason}"),
        },
    }
}

/// Pull the human-readable message out of a CMS error body.
fn error_reason(body: &str) -> Option<String> {
    let error: WireError = serde_json::from_str(body).ok()?;
    let message = error.message?;
    match error.details {
        Some(details) if !details.is_null() => Some(format!("{message} ({details})")),
        _ => Some(message),
    }
}

async fn read_entry(
    response: Response,
    operation: &str,
    fallback_type: Option<&str>,
) -> Result<Entry, ClientError> {
    let wire: WireEntry = response.json().await.map_err(|e| ClientError::Network {
        operation: operation.to_string(),
        reason: format!("invalid response body: {e}"),
    })?;

    wire.into_entry(fallback_type).ok_or_else(|| ClientError::Network {
        operation: operation.to_string(),
        reason: "response is missing sys.contentType".to_string(),
    })
}
