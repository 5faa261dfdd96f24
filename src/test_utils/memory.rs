//! In-memory CMS for tests.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::{DashMap, DashSet};

use crate::client::{ClientError, CmsClient};
use crate::models::{Entry, EntryId, Fields};

#[derive(Debug, Default)]
struct Store {
    entries: DashMap<EntryId, Entry>,
    fetches: DashMap<EntryId, usize>,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    next_id: AtomicUsize,
    created: Mutex<Vec<EntryId>>,
    failing_fetches: DashSet<EntryId>,
    failing_creates: DashSet<String>,
    failing_updates: DashSet<String>,
    fetch_delay_ms: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// A [`CmsClient`] keeping entries in memory.
///
/// Cloning the client shares the store, so a test can hand one handle to the
/// pipeline and inspect the other. Created entries get ids `clone-1`,
/// `clone-2`, ...; every write bumps the entry's version and updates with a
/// stale version fail with [`ClientError::Conflict`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryCmsClient {
    store: Arc<Store>,
}

impl InMemoryCmsClient {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store built from `entries`.
    #[must_use]
    pub fn with_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let client = Self::new();
        for entry in entries {
            client.insert(entry);
        }
        client
    }

    /// Store `entry` (version 1 unless it has one) and return the stored copy.
    pub fn insert(&self, mut entry: Entry) -> Entry {
        entry.version.get_or_insert(1);
        self.store.entries.insert(entry.id.clone(), entry.clone());
        entry
    }

    /// Current state of an entry.
    #[must_use]
    pub fn get(&self, id: &EntryId) -> Option<Entry> {
        self.store.entries.get(id).map(|entry| entry.clone())
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.entries.is_empty()
    }

    /// Fetch calls made for `id`.
    #[must_use]
    pub fn fetch_count(&self, id: &EntryId) -> usize {
        self.store.fetches.get(id).map_or(0, |count| *count)
    }

    /// Fetch calls made in total.
    #[must_use]
    pub fn total_fetches(&self) -> usize {
        self.store.fetches.iter().map(|count| *count.value()).sum()
    }

    /// Create calls made, including failed ones.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.store.create_calls.load(Ordering::SeqCst)
    }

    /// Update calls made, including failed ones.
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.store.update_calls.load(Ordering::SeqCst)
    }

    /// Ids of successfully created entries, in creation order.
    #[must_use]
    pub fn created_ids(&self) -> Vec<EntryId> {
        self.store.created.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Highest number of fetches observed in flight at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.store.max_in_flight.load(Ordering::SeqCst)
    }

    /// Make fetches of `id` fail with a network error.
    pub fn fail_fetch(&self, id: impl Into<EntryId>) {
        self.store.failing_fetches.insert(id.into());
    }

    /// Make creations of `content_type` fail with a validation error.
    pub fn fail_create_of(&self, content_type: impl Into<String>) {
        self.store.failing_creates.insert(content_type.into());
    }

    /// Make updates of `content_type` entries fail with a conflict.
    pub fn fail_update_of(&self, content_type: impl Into<String>) {
        self.store.failing_updates.insert(content_type.into());
    }

    /// Delay every fetch, so concurrency limits become observable.
    #[must_use]
    pub fn with_fetch_delay(self, delay: Duration) -> Self {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.store.fetch_delay_ms.store(millis, Ordering::SeqCst);
        self
    }
}

impl CmsClient for InMemoryCmsClient {
    async fn fetch_entry(&self, id: &EntryId) -> Result<Entry, ClientError> {
        *self.store.fetches.entry(id.clone()).or_insert(0) += 1;

        let in_flight = self.store.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.store.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        let delay = self.store.fetch_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.store.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.store.failing_fetches.contains(id) {
            return Err(ClientError::Network {
                operation: "fetch entry".to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.get(id).ok_or_else(|| ClientError::NotFound {
            id: id.clone(),
        })
    }

    async fn create_entry(&self, content_type: &str, fields: Fields) -> Result<Entry, ClientError> {
        self.store.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.store.failing_creates.contains(content_type) {
            return Err(ClientError::Validation {
                content_type: content_type.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        let n = self.store.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let entry = self.insert(Entry::new(format!("clone-{n}"), content_type, fields));
        self.store.created.lock().unwrap_or_else(PoisonError::into_inner).push(entry.id.clone());
        Ok(entry)
    }

    async fn update_entry(&self, entry: Entry) -> Result<Entry, ClientError> {
        self.store.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.store.failing_updates.contains(&entry.content_type) {
            return Err(ClientError::Conflict {
                id: entry.id,
                reason: "injected failure".to_string(),
            });
        }

        let Some(mut stored) = self.store.entries.get_mut(&entry.id) else {
            return Err(ClientError::NotFound {
                id: entry.id,
            });
        };
        if entry.version.is_some() && stored.version != entry.version {
            return Err(ClientError::Conflict {
                id: entry.id,
                reason: format!("expected version {:?}, found {:?}", entry.version, stored.version),
            });
        }
        stored.fields = entry.fields;
        stored.version = Some(stored.version.unwrap_or(0) + 1);
        Ok(stored.clone())
    }
}
