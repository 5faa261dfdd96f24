//! CMS collaborator contract.
//!
//! The clone pipeline never talks HTTP itself; it drives a [`CmsClient`]:
//!
//! - [`CmsClient::fetch_entry`] during discovery
//! - [`CmsClient::create_entry`] during transformation
//! - [`CmsClient::update_entry`] during relinking
//!
//! Implementations:
//!
//! - [`HttpCmsClient`] - Content Management API over `reqwest`, with retries
//! - [`DryRunClient`] - wraps another client, reads for real, fakes writes
//! - `test_utils::InMemoryCmsClient` - in-memory store for tests (feature `test-utils`)

pub mod dry_run;
pub mod http;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::models::{Entry, EntryId, Fields};

pub use dry_run::DryRunClient;
pub use http::{HttpClientConfig, HttpCmsClient};

/// Failures reported by a [`CmsClient`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The entry does not exist (or is not visible with the current token).
    #[error("Entry '{id}' not found")]
    NotFound {
        /// Requested entry id
        id: EntryId,
    },

    /// Transport failure or unexpected server response.
    #[error("Network error during {operation}: {reason}")]
    Network {
        /// Operation being performed (e.g. "fetch entry")
        operation: String,
        /// What went wrong
        reason: String,
    },

    /// The CMS rejected the fields for the target content type.
    #[error("CMS rejected entry of type '{content_type}': {reason}")]
    Validation {
        /// Content type the entry was written as
        content_type: String,
        /// Validation details from the CMS
        reason: String,
    },

    /// The entry changed since it was read (version mismatch).
    #[error("Version conflict on entry '{id}': {reason}")]
    Conflict {
        /// Entry being updated
        id: EntryId,
        /// Conflict details from the CMS
        reason: String,
    },

    /// The CMS asked us to slow down.
    #[error("Rate limited by the CMS, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the rate limit window resets
        retry_after_secs: u64,
    },
}

impl ClientError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::RateLimited { .. })
    }

    /// Suggested wait before retrying, when the CMS provided one.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited {
                retry_after_secs,
            } => Some(Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }
}

/// Operations the clone pipeline needs from the CMS.
///
/// Every method is an await point; implementations must return `Send`
/// futures so fanned-out discovery can be polled from any runtime thread.
pub trait CmsClient: Send + Sync {
    /// Fetch one entry by id.
    ///
    /// Fails with [`ClientError::NotFound`] or [`ClientError::Network`].
    fn fetch_entry(&self, id: &EntryId) -> impl Future<Output = Result<Entry, ClientError>> + Send;

    /// Create a new entry of `content_type`; the CMS assigns the id.
    ///
    /// Fails with [`ClientError::Validation`] or [`ClientError::Network`].
    fn create_entry(
        &self,
        content_type: &str,
        fields: Fields,
    ) -> impl Future<Output = Result<Entry, ClientError>> + Send;

    /// Persist field changes on an existing entry, identified by `entry.id`.
    ///
    /// Fails with [`ClientError::Conflict`] or [`ClientError::Network`].
    fn update_entry(&self, entry: Entry) -> impl Future<Output = Result<Entry, ClientError>> + Send;
}
