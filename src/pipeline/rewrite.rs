//! Relinking: point the clones at each other and persist them.

use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{self, StreamExt};

use super::CloneMap;
use crate::client::{ClientError, CmsClient};
use crate::core::{CloneContext, CloneError, Phase};
use crate::models::{EntryId, Fields, Link, VisitLinksMut};
use crate::utils::progress::ProgressEvent;

/// Rewrite every entry link in `fields` whose target was cloned.
///
/// Links to entries outside `clones` (skip-copy entries, or anything not
/// discovered) and non-entry links are left as they are. Returns the number
/// of links rewritten.
pub fn relink(fields: &mut Fields, clones: &CloneMap) -> usize {
    let mut rewritten = 0;
    fields.visit_links_mut(&mut |link: &mut Link| {
        if !link.is_entry() {
            return;
        }
        if let Some(clone_id) = clones.resolve(&link.id) {
            link.id = clone_id.clone();
            rewritten += 1;
        }
    });
    rewritten
}

/// Relink and persist every clone in `clones`.
///
/// Returns the persisted clones keyed by original id.
///
/// # Errors
///
/// The first failed update stops further updates with [`CloneError::Update`],
/// which lists every clone as orphaned; clones not yet persisted keep linking
/// to the originals.
pub async fn rewrite<C: CmsClient>(
    ctx: &CloneContext,
    client: &C,
    clones: &CloneMap,
    max_concurrency: usize,
) -> Result<CloneMap, CloneError> {
    ctx.progress().emit(ProgressEvent::PhaseStarted {
        phase: Phase::Rewrite,
    });
    ctx.ensure_not_cancelled(Phase::Rewrite, || clones.clone_ids())?;

    let total = clones.len();
    let order: Vec<EntryId> = clones.iter().map(|(original_id, _)| original_id.clone()).collect();
    let stop = AtomicBool::new(false);
    let mut persisted = CloneMap::new();
    let mut failure: Option<(EntryId, EntryId, ClientError)> = None;

    {
        let stop = &stop;
        let mut updates = stream::iter(clones.iter())
            .map(move |(original_id, clone)| async move {
                if stop.load(Ordering::SeqCst) || ctx.is_cancelled() {
                    return None;
                }
                let mut entry = clone.clone();
                let links = relink(&mut entry.fields, clones);
                tracing::debug!(target: "rewrite", "Updating {} ({links} link(s) rewritten)", entry.id);
                let clone_id = entry.id.clone();
                Some((original_id.clone(), clone_id, client.update_entry(entry).await))
            })
            .buffer_unordered(max_concurrency.max(1));

        while let Some(update) = updates.next().await {
            let Some((original_id, clone_id, result)) = update else {
                continue;
            };
            match result {
                Ok(updated) => {
                    persisted.insert(original_id, updated);
                    ctx.record_updated(total);
                }
                Err(source) => {
                    stop.store(true, Ordering::SeqCst);
                    if failure.is_none() {
                        failure = Some((original_id, clone_id, source));
                    }
                }
            }
        }
    }

    if let Some((original_id, clone_id, source)) = failure {
        tracing::warn!(
            target: "rewrite",
            "{} of {total} clone(s) were relinked before the failure",
            persisted.len()
        );
        return Err(CloneError::Update {
            original_id,
            clone_id,
            orphaned: clones.clone_ids(),
            source,
        });
    }

    if persisted.len() < total {
        return Err(CloneError::Cancelled {
            phase: Phase::Rewrite,
            orphaned: clones.clone_ids(),
        });
    }

    persisted.reorder(&order);
    ctx.progress().emit(ProgressEvent::PhaseFinished {
        phase: Phase::Rewrite,
        count: persisted.len(),
    });
    tracing::info!(target: "rewrite", "Updating done.");
    Ok(persisted)
}
