//! The clone pipeline.
//!
//! A clone runs three phases in strict order over one [`CloneContext`]:
//!
//! 1. [`discovery`] - walk entry links from the root, fetching every reachable
//!    entry exactly once, into a [`ReferenceSet`]
//! 2. [`transform`] - apply the content type's rule to each entry and create
//!    the clones, building a [`CloneMap`] from original id to clone
//! 3. [`rewrite`] - point every entry link inside the clones at the matching
//!    clone and persist them
//!
//! Relinking starts only after every clone exists, because forward references
//! and cycles can only be resolved against the complete [`CloneMap`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use deepcopy_cli::client::{HttpClientConfig, HttpCmsClient};
//! use deepcopy_cli::models::EntryId;
//! use deepcopy_cli::pipeline::{CloneOptions, Cloner};
//! use deepcopy_cli::rules::TitleSpec;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = HttpCmsClient::new(HttpClientConfig {
//!     space_id: "space".into(),
//!     access_token: "token".into(),
//!     ..HttpClientConfig::default()
//! })?;
//!
//! let report = Cloner::new(&client)
//!     .with_options(CloneOptions {
//!         title: TitleSpec::Replace("Autumn Launch".into()),
//!         ..CloneOptions::default()
//!     })
//!     .run(&EntryId::new("4xTkRoot"))
//!     .await?;
//!
//! println!("new toolkit: {}", report.root.id);
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod rewrite;
pub mod transform;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::client::CmsClient;
use crate::constants::{
    DEFAULT_DESCRIPTION, DEFAULT_LOCALE, DEFAULT_MAX_CONCURRENCY, DEFAULT_PROGRESS_EVERY,
    DEFAULT_SYNOPSIS,
};
use crate::core::{CancellationFlag, CloneContext, CloneError, Phase};
use crate::models::{Entry, EntryId};
use crate::rules::{RuleContext, RuleRegistry, TitleSpec, UnrecognizedPolicy};
use crate::utils::progress::{ProgressEvent, ProgressReporter, ProgressSink, TracingSink};

/// Every entry reachable from the root, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    entries: HashMap<EntryId, Entry>,
    order: Vec<EntryId>,
}

impl ReferenceSet {
    /// Build from entries in discovery order; later duplicates are ignored.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let mut set = Self::default();
        for entry in entries {
            if !set.entries.contains_key(&entry.id) {
                set.order.push(entry.id.clone());
                set.entries.insert(entry.id.clone(), entry);
            }
        }
        set
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing was discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entry by original id.
    #[must_use]
    pub fn get(&self, id: &EntryId) -> Option<&Entry> {
        self.entries.get(id)
    }

    /// Whether `id` was discovered.
    #[must_use]
    pub fn contains(&self, id: &EntryId) -> bool {
        self.entries.contains_key(id)
    }

    /// Ids in discovery order.
    #[must_use]
    pub fn ids(&self) -> &[EntryId] {
        &self.order
    }

    /// Entries in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Number of entries per content type.
    #[must_use]
    pub fn count_by_content_type(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.entries.values() {
            *counts.entry(entry.content_type.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Original entry id → clone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloneMap {
    clones: HashMap<EntryId, Entry>,
    order: Vec<EntryId>,
}

impl CloneMap {
    /// Empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the clone of `original`, replacing any earlier one.
    pub fn insert(&mut self, original: EntryId, clone: Entry) {
        if self.clones.insert(original.clone(), clone).is_none() {
            self.order.push(original);
        }
    }

    /// Clone of `original`.
    #[must_use]
    pub fn get(&self, original: &EntryId) -> Option<&Entry> {
        self.clones.get(original)
    }

    /// Id of the clone of `original`.
    #[must_use]
    pub fn resolve(&self, original: &EntryId) -> Option<&EntryId> {
        self.clones.get(original).map(|clone| &clone.id)
    }

    /// Whether `original` was cloned.
    #[must_use]
    pub fn contains(&self, original: &EntryId) -> bool {
        self.clones.contains_key(original)
    }

    /// Number of clones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no clone exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `(original id, clone)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntryId, &Entry)> {
        self.order.iter().filter_map(|id| self.clones.get(id).map(|clone| (id, clone)))
    }

    /// Ids of every clone, in insertion order.
    #[must_use]
    pub fn clone_ids(&self) -> Vec<EntryId> {
        self.iter().map(|(_, clone)| clone.id.clone()).collect()
    }

    /// Reorder to follow `order`; ids not in the map are ignored.
    pub(crate) fn reorder(&mut self, order: &[EntryId]) {
        self.order = order.iter().filter(|id| self.clones.contains_key(*id)).cloned().collect();
    }
}

/// Caller-tunable behaviour of a clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneOptions {
    /// Presentation locale for labels and overwritten fields.
    pub locale: String,
    /// Title handling for the root toolkit.
    pub title: TitleSpec,
    /// Placeholder description for replaced toolkits.
    pub default_description: String,
    /// Placeholder synopsis for replaced toolkits.
    pub default_synopsis: String,
    /// Handling of content types without a rule.
    pub unrecognized: UnrecognizedPolicy,
    /// CMS calls in flight per phase.
    pub max_concurrency: usize,
    /// Report progress every this many entries.
    pub progress_every: usize,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            title: TitleSpec::default(),
            default_description: DEFAULT_DESCRIPTION.to_string(),
            default_synopsis: DEFAULT_SYNOPSIS.to_string(),
            unrecognized: UnrecognizedPolicy::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

impl CloneOptions {
    /// Presentation options for rules.
    #[must_use]
    pub fn rule_context(&self) -> RuleContext {
        RuleContext {
            locale: self.locale.clone(),
            title: self.title.clone(),
            default_description: self.default_description.clone(),
            default_synopsis: self.default_synopsis.clone(),
        }
    }
}

/// Outcome of a successful clone.
#[derive(Debug, Clone)]
pub struct CloneReport {
    /// Persisted clone of the root entry.
    pub root: Entry,
    /// Every persisted clone, keyed by original id.
    pub clones: CloneMap,
    /// Entries discovered.
    pub discovered: usize,
    /// Clones created.
    pub created: usize,
    /// Clones relinked and persisted.
    pub updated: usize,
    /// Entries discovered but linked rather than copied.
    pub skipped: Vec<EntryId>,
}

/// Configures and runs clones against one CMS client.
pub struct Cloner<'a, C> {
    client: &'a C,
    options: CloneOptions,
    registry: RuleRegistry,
    sink: Arc<dyn ProgressSink>,
    cancel: CancellationFlag,
}

impl<'a, C: CmsClient> Cloner<'a, C> {
    /// Cloner with default options, built-in rules and `tracing` progress.
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            options: CloneOptions::default(),
            registry: RuleRegistry::builtin(),
            sink: Arc::new(TracingSink),
            cancel: CancellationFlag::new(),
        }
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: CloneOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the rule registry.
    #[must_use]
    pub fn with_registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Send progress events to `sink`.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Observe `cancel`; raising it stops the clone at the next CMS call.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Current options.
    #[must_use]
    pub fn options(&self) -> &CloneOptions {
        &self.options
    }

    fn context(&self) -> CloneContext {
        CloneContext::with_progress(
            ProgressReporter::new(Arc::clone(&self.sink), self.options.progress_every),
            self.cancel.clone(),
        )
    }

    /// Clone the tree rooted at `root`.
    ///
    /// # Errors
    ///
    /// Any phase failure aborts the clone; see [`CloneError`]. Clones created
    /// before the failure are not removed.
    pub async fn run(&self, root: &EntryId) -> Result<CloneReport, CloneError> {
        tracing::info!("Starting clone of {root}...");
        let ctx = self.context();
        let concurrency = self.options.max_concurrency;

        let references = discovery::discover(&ctx, self.client, root, concurrency)
            .await
            .inspect_err(|_| failed(&ctx, Phase::Discovery))?;

        let plan = transform::plan(&references, &self.registry, &self.options)?;
        if let Some(linked) = plan.linked().iter().find(|linked| &linked.id == root) {
            return Err(CloneError::RootNotCloned {
                id: root.clone(),
                content_type: linked.content_type.clone(),
            });
        }
        let skipped: Vec<EntryId> = plan.linked().iter().map(|linked| linked.id.clone()).collect();

        let clones = transform::create(&ctx, self.client, plan, concurrency)
            .await
            .inspect_err(|_| failed(&ctx, Phase::Transform))?;
        let persisted = rewrite::rewrite(&ctx, self.client, &clones, concurrency)
            .await
            .inspect_err(|_| failed(&ctx, Phase::Rewrite))?;

        let root_clone = persisted.get(root).cloned().ok_or_else(|| CloneError::Other {
            message: format!("clone of root entry '{root}' is missing after relinking"),
        })?;

        let counters = ctx.counters();
        tracing::info!("Clone of {root} finished: new root is {}", root_clone.id);
        Ok(CloneReport {
            root: root_clone,
            discovered: counters.discovered(),
            created: counters.created(),
            updated: counters.updated(),
            clones: persisted,
            skipped,
        })
    }

    /// Run discovery only; nothing is created.
    ///
    /// # Errors
    ///
    /// Fails with [`CloneError::Fetch`] or [`CloneError::Cancelled`].
    pub async fn discover_only(&self, root: &EntryId) -> Result<ReferenceSet, CloneError> {
        let ctx = self.context();
        discovery::discover(&ctx, self.client, root, self.options.max_concurrency)
            .await
            .inspect_err(|_| failed(&ctx, Phase::Discovery))
    }
}

fn failed(ctx: &CloneContext, phase: Phase) {
    ctx.progress().emit(ProgressEvent::PhaseFailed {
        phase,
    });
}

/// Clone the tree rooted at `root` with default options and return the new root.
///
/// # Errors
///
/// See [`Cloner::run`].
pub async fn clone_tree<C: CmsClient>(
    client: &C,
    root: &EntryId,
    title: TitleSpec,
) -> Result<Entry, CloneError> {
    Cloner::new(client)
        .with_options(CloneOptions {
            title,
            ..CloneOptions::default()
        })
        .run(root)
        .await
        .map(|report| report.root)
}
