//! Dry-run wrapper: real reads, simulated writes.

use uuid::Uuid;

use super::{ClientError, CmsClient};
use crate::models::{Entry, EntryId, Fields};

/// Wraps a [`CmsClient`] so that a clone can be rehearsed against live content.
///
/// Fetches go to the wrapped client. Creations return a fabricated entry with
/// a `dry-run-` id and nothing is written; updates echo the entry back.
#[derive(Debug, Clone)]
pub struct DryRunClient<C> {
    inner: C,
}

impl<C: CmsClient> DryRunClient<C> {
    /// Wrap `inner`.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
        }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: CmsClient> CmsClient for DryRunClient<C> {
    async fn fetch_entry(&self, id: &EntryId) -> Result<Entry, ClientError> {
        self.inner.fetch_entry(id).await
    }

    async fn create_entry(&self, content_type: &str, fields: Fields) -> Result<Entry, ClientError> {
        let id = EntryId::new(format!("dry-run-{}", Uuid::new_v4().simple()));
        tracing::debug!(target: "client", "[dry run] would create {content_type} as {id}");
        Ok(Entry {
            id,
            content_type: content_type.to_string(),
            version: Some(1),
            fields,
        })
    }

    async fn update_entry(&self, entry: Entry) -> Result<Entry, ClientError> {
        tracing::debug!(target: "client", "[dry run] would update {}", entry.id);
        Ok(entry)
    }
}
