//! Reference discovery: the reachable set of entries from a root.
//!
//! A flat worklist rather than recursion, so a long chain of links costs
//! queue space and never stack depth. Each entry id is claimed in the context
//! before it is queued, so an entry linked from several places (or from
//! inside a cycle) is fetched once and traversal always terminates. Queued
//! fetches run concurrently; a semaphore caps the fetches in flight.
//!
//! The first failure raises a stop flag: fetches already under way settle,
//! queued ones are dropped without calling the CMS.

use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use super::ReferenceSet;
use crate::client::CmsClient;
use crate::core::{CloneContext, CloneError, Phase};
use crate::models::{Entry, EntryId};
use crate::utils::progress::ProgressEvent;

/// Fetch every entry reachable from `root` through entry links.
///
/// # Errors
///
/// The first failed fetch aborts discovery with [`CloneError::Fetch`] naming
/// the entry; fetches already in flight settle first and no new ones are
/// issued. Returns [`CloneError::Cancelled`] if the context is cancelled.
pub async fn discover<C: CmsClient>(
    ctx: &CloneContext,
    client: &C,
    root: &EntryId,
    max_concurrency: usize,
) -> Result<ReferenceSet, CloneError> {
    ctx.progress().emit(ProgressEvent::PhaseStarted {
        phase: Phase::Discovery,
    });
    ctx.ensure_not_cancelled(Phase::Discovery, Vec::new)?;

    let limiter = Semaphore::new(max_concurrency.max(1));
    let stop = AtomicBool::new(false);
    let mut failure: Option<CloneError> = None;
    let mut pending = FuturesUnordered::new();

    if ctx.claim(root) {
        pending.push(fetch(ctx, client, &limiter, &stop, root.clone()));
    }

    while let Some(result) = pending.next().await {
        match result {
            Ok(Some(entry)) => {
                if failure.is_some() {
                    continue;
                }
                let links = entry.fields.entry_link_targets();
                tracing::debug!(
                    target: "discovery",
                    "{} ({}) links to {} entr{}",
                    entry.id,
                    entry.content_type,
                    links.len(),
                    if links.len() == 1 { "y" } else { "ies" }
                );
                ctx.record(entry);
                for link in links {
                    if ctx.claim(&link) {
                        pending.push(fetch(ctx, client, &limiter, &stop, link));
                    }
                }
            }
            Ok(None) => {}
            Err(error) => {
                stop.store(true, Ordering::SeqCst);
                if failure.is_none() {
                    failure = Some(error);
                }
            }
        }
    }

    if let Some(error) = failure {
        return Err(error);
    }

    let references = ReferenceSet::from_entries(ctx.take_discovered());
    tracing::info!(target: "discovery", "Found {} reference(s) from {root}", references.len());
    ctx.progress().emit(ProgressEvent::PhaseFinished {
        phase: Phase::Discovery,
        count: references.len(),
    });
    Ok(references)
}

/// Fetch one claimed entry, or nothing once discovery has been stopped.
async fn fetch<C: CmsClient>(
    ctx: &CloneContext,
    client: &C,
    limiter: &Semaphore,
    stop: &AtomicBool,
    id: EntryId,
) -> Result<Option<Entry>, CloneError> {
    let _permit = limiter.acquire().await.map_err(|_| CloneError::Other {
        message: "discovery limiter closed".to_string(),
    })?;
    if stop.load(Ordering::SeqCst) {
        return Ok(None);
    }
    ctx.ensure_not_cancelled(Phase::Discovery, Vec::new)?;
    tracing::debug!(target: "discovery", "Fetching {id}");
    client.fetch_entry(&id).await.map(Some).map_err(|source| CloneError::Fetch {
        id,
        source,
    })
}
