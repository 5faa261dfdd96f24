//! Invocation-scoped state for a clone.
//!
//! A [`CloneContext`] is created at the start of every clone and dropped when
//! it ends. It holds everything the original tool kept in module globals: the
//! set of claimed entry ids, the fetched entries, the progress counters and a
//! cancellation flag. Two clones running at the same time never share state.
//!
//! # Example
//!
//! ```rust
//! use deepcopy_cli::core::CloneContext;
//! use deepcopy_cli::models::EntryId;
//!
//! let ctx = CloneContext::new();
//! let id = EntryId::new("root");
//!
//! // First claimant wins
//! assert!(ctx.claim(&id));
//! assert!(!ctx.claim(&id));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::{DashMap, DashSet};

use super::CloneError;
use crate::models::{Entry, EntryId};
use crate::utils::progress::{ProgressEvent, ProgressReporter};

/// Pipeline phase, used in progress events and cancellation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Walking the reference graph.
    Discovery,
    /// Transforming and creating clones.
    Transform,
    /// Relinking and persisting clones.
    Rewrite,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery => f.write_str("discovery"),
            Self::Transform => f.write_str("transform"),
            Self::Rewrite => f.write_str("rewrite"),
        }
    }
}

/// Cooperative cancellation shared between a clone and its caller.
///
/// Raising the flag stops new CMS calls from being issued; calls already in
/// flight are allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// A flag that is not raised.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the flag has been raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Monotonic per-invocation progress counters.
#[derive(Debug, Default)]
pub struct Counters {
    discovered: AtomicUsize,
    created: AtomicUsize,
    updated: AtomicUsize,
}

impl Counters {
    /// Entries fetched during discovery.
    #[must_use]
    pub fn discovered(&self) -> usize {
        self.discovered.load(Ordering::Relaxed)
    }

    /// Clones created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Clones relinked and persisted.
    #[must_use]
    pub fn updated(&self) -> usize {
        self.updated.load(Ordering::Relaxed)
    }
}

/// State for one clone invocation.
#[derive(Debug, Default)]
pub struct CloneContext {
    claimed: DashSet<EntryId>,
    entries: DashMap<EntryId, Entry>,
    order: Mutex<Vec<EntryId>>,
    counters: Counters,
    cancel: CancellationFlag,
    progress: ProgressReporter,
}

impl CloneContext {
    /// Context logging progress through `tracing` with its own cancellation flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context reporting to `progress` and observing `cancel`.
    #[must_use]
    pub fn with_progress(progress: ProgressReporter, cancel: CancellationFlag) -> Self {
        Self {
            progress,
            cancel,
            ..Self::default()
        }
    }

    /// Claim `id` for fetching.
    ///
    /// Returns `true` for the first caller only; this is what keeps discovery
    /// from fetching an entry twice or looping on cyclic links.
    pub fn claim(&self, id: &EntryId) -> bool {
        self.claimed.insert(id.clone())
    }

    /// Record a fetched entry and report discovery progress.
    ///
    /// Returns the number of entries discovered so far.
    pub fn record(&self, entry: Entry) -> usize {
        self.order.lock().unwrap_or_else(PoisonError::into_inner).push(entry.id.clone());
        self.entries.insert(entry.id.clone(), entry);
        let found = self.counters.discovered.fetch_add(1, Ordering::Relaxed) + 1;
        self.progress.tick(
            found,
            None,
            ProgressEvent::Discovered {
                found,
            },
        );
        found
    }

    /// Move the recorded entries out, in discovery order.
    pub fn take_discovered(&self) -> Vec<Entry> {
        let order =
            std::mem::take(&mut *self.order.lock().unwrap_or_else(PoisonError::into_inner));
        order.into_iter().filter_map(|id| self.entries.remove(&id).map(|(_, entry)| entry)).collect()
    }

    /// Count a created clone and report progress.
    pub fn record_created(&self, total: usize) -> usize {
        let created = self.counters.created.fetch_add(1, Ordering::Relaxed) + 1;
        self.progress.tick(
            created,
            Some(total),
            ProgressEvent::Created {
                created,
                total,
            },
        );
        created
    }

    /// Count a persisted clone and report progress.
    pub fn record_updated(&self, total: usize) -> usize {
        let updated = self.counters.updated.fetch_add(1, Ordering::Relaxed) + 1;
        self.progress.tick(
            updated,
            Some(total),
            ProgressEvent::Updated {
                updated,
                total,
            },
        );
        updated
    }

    /// Progress counters.
    #[must_use]
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Progress reporter for phase boundaries.
    #[must_use]
    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    /// The cancellation flag observed by this invocation.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancel
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with [`CloneError::Cancelled`] if cancellation has been requested.
    pub fn ensure_not_cancelled(
        &self,
        phase: Phase,
        orphaned: impl FnOnce() -> Vec<EntryId>,
    ) -> Result<(), CloneError> {
        if self.is_cancelled() {
            return Err(CloneError::Cancelled {
                phase,
                orphaned: orphaned(),
            });
        }
        Ok(())
    }
}
