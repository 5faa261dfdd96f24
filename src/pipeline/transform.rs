//! Transformation: apply rules and create the clones.
//!
//! Split in two so nothing is created unless the whole set can be planned:
//! [`plan`] runs every rule synchronously (and is where the `reject` policy
//! fails), then [`create`] issues the creation calls.

use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{self, StreamExt};

use super::{CloneMap, CloneOptions, ReferenceSet};
use crate::client::{ClientError, CmsClient};
use crate::core::{CloneContext, CloneError, Phase};
use crate::models::{Entry, EntryId, Fields};
use crate::rules::{RuleRegistry, UnrecognizedPolicy};
use crate::utils::progress::ProgressEvent;

/// An entry that will be cloned.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCopy {
    /// Original entry id
    pub original_id: EntryId,
    /// Content type the clone is created as
    pub content_type: String,
    /// Transformed fields
    pub fields: Fields,
    /// Label for progress logs
    pub label: String,
}

/// An entry that stays shared between original and clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedEntry {
    /// Entry id
    pub id: EntryId,
    /// Its content type
    pub content_type: String,
}

/// Rule results for a whole reference set.
#[derive(Debug, Clone, Default)]
pub struct TransformPlan {
    copies: Vec<PlannedCopy>,
    linked: Vec<LinkedEntry>,
}

impl TransformPlan {
    /// Entries to clone, in discovery order.
    #[must_use]
    pub fn copies(&self) -> &[PlannedCopy] {
        &self.copies
    }

    /// Skip-copy entries, in discovery order.
    #[must_use]
    pub fn linked(&self) -> &[LinkedEntry] {
        &self.linked
    }
}

/// Apply the registered rule to every entry.
///
/// # Errors
///
/// Returns [`CloneError::UnrecognizedContentType`] for the first entry without
/// a rule when the policy is [`UnrecognizedPolicy::Reject`].
pub fn plan(
    references: &ReferenceSet,
    registry: &RuleRegistry,
    options: &CloneOptions,
) -> Result<TransformPlan, CloneError> {
    let rule_ctx = options.rule_context();
    let mut plan = TransformPlan::default();

    for entry in references.iter() {
        let outcome = match registry.apply(entry, &rule_ctx) {
            Some(outcome) => outcome,
            None => {
                warn_unrecognized(registry, entry, options.unrecognized);
                match options.unrecognized {
                    UnrecognizedPolicy::Clone => registry.passthrough(entry, false),
                    UnrecognizedPolicy::Link => registry.passthrough(entry, true),
                    UnrecognizedPolicy::Reject => {
                        return Err(CloneError::UnrecognizedContentType {
                            id: entry.id.clone(),
                            content_type: entry.content_type.clone(),
                        });
                    }
                }
            }
        };

        if outcome.skip_copy {
            plan.linked.push(LinkedEntry {
                id: entry.id.clone(),
                content_type: entry.content_type.clone(),
            });
        } else {
            plan.copies.push(PlannedCopy {
                original_id: entry.id.clone(),
                content_type: entry.content_type.clone(),
                fields: outcome.fields,
                label: outcome.label.unwrap_or_else(|| entry.id.to_string()),
            });
        }
    }

    Ok(plan)
}

fn warn_unrecognized(registry: &RuleRegistry, entry: &Entry, policy: UnrecognizedPolicy) {
    match registry.suggest(&entry.content_type) {
        Some(known) => tracing::warn!(
            target: "transform",
            "Unrecognized type '{}' on entry {} (did you mean '{known}'?); policy: {policy}",
            entry.content_type,
            entry.id
        ),
        None => tracing::warn!(
            target: "transform",
            "Unrecognized type '{}' on entry {}; policy: {policy}",
            entry.content_type,
            entry.id
        ),
    }
}

enum Attempt {
    NotStarted,
    Finished {
        original_id: EntryId,
        content_type: String,
        label: String,
        result: Result<Entry, ClientError>,
    },
}

/// Create a clone for every planned copy.
///
/// # Errors
///
/// The first failed creation stops further calls; calls already in flight
/// settle and the error lists every clone created so far as orphaned.
/// Cancellation behaves the same way and yields [`CloneError::Cancelled`].
pub async fn create<C: CmsClient>(
    ctx: &CloneContext,
    client: &C,
    plan: TransformPlan,
    max_concurrency: usize,
) -> Result<CloneMap, CloneError> {
    ctx.progress().emit(ProgressEvent::PhaseStarted {
        phase: Phase::Transform,
    });
    for linked in &plan.linked {
        tracing::info!(target: "transform", "Link: {}", linked.content_type);
    }

    let total = plan.copies.len();
    let order: Vec<EntryId> = plan.copies.iter().map(|copy| copy.original_id.clone()).collect();
    let stop = AtomicBool::new(false);
    let mut clones = CloneMap::new();
    let mut failure: Option<(EntryId, String, ClientError)> = None;

    {
        let stop = &stop;
        let mut attempts = stream::iter(plan.copies)
            .map(move |copy| async move {
                if stop.load(Ordering::SeqCst) || ctx.is_cancelled() {
                    return Attempt::NotStarted;
                }
                tracing::debug!(target: "transform", "Creating {} from {}", copy.content_type, copy.original_id);
                let result = client.create_entry(&copy.content_type, copy.fields).await;
                Attempt::Finished {
                    original_id: copy.original_id,
                    content_type: copy.content_type,
                    label: copy.label,
                    result,
                }
            })
            .buffer_unordered(max_concurrency.max(1));

        while let Some(attempt) = attempts.next().await {
            let Attempt::Finished {
                original_id,
                content_type,
                label,
                result,
            } = attempt
            else {
                continue;
            };
            match result {
                Ok(created) => {
                    tracing::info!(target: "transform", "New {content_type}: {label}");
                    tracing::debug!(target: "transform", "{original_id} -> {}", created.id);
                    clones.insert(original_id, created);
                    ctx.record_created(total);
                }
                Err(source) => {
                    stop.store(true, Ordering::SeqCst);
                    if failure.is_none() {
                        failure = Some((original_id, content_type, source));
                    }
                }
            }
        }
    }

    clones.reorder(&order);

    if let Some((original_id, content_type, source)) = failure {
        let orphaned = clones.clone_ids();
        if !orphaned.is_empty() {
            tracing::warn!(
                target: "transform",
                "{} clone(s) created before the failure were left in place",
                orphaned.len()
            );
        }
        return Err(CloneError::Create {
            original_id,
            content_type,
            orphaned,
            source,
        });
    }

    if clones.len() < total {
        return Err(CloneError::Cancelled {
            phase: Phase::Transform,
            orphaned: clones.clone_ids(),
        });
    }

    ctx.progress().emit(ProgressEvent::PhaseFinished {
        phase: Phase::Transform,
        count: clones.len(),
    });
    Ok(clones)
}

/// [`plan`] then [`create`].
///
/// # Errors
///
/// See [`plan`] and [`create`].
pub async fn transform<C: CmsClient>(
    ctx: &CloneContext,
    client: &C,
    registry: &RuleRegistry,
    options: &CloneOptions,
    references: &ReferenceSet,
) -> Result<CloneMap, CloneError> {
    let plan = plan(references, registry, options)?;
    create(ctx, client, plan, options.max_concurrency).await
}
