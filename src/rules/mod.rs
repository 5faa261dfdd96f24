//! Per-content-type field transformations.
//!
//! Every discovered entry is passed through the [`TransformRule`] registered
//! for its content type before a clone is created. A rule is a pure function
//! of the entry's fields and the caller's presentation options; it decides
//! which fields survive, which are reset, and whether the entry is copied at
//! all or only linked to ("skip-copy").
//!
//! After the type rule, [`RuleRegistry::apply`] strips the localization
//! workflow fields from every entry that will be copied.
//!
//! # Examples
//!
//! ```rust
//! use deepcopy_cli::models::{Entry, FieldValue, Fields};
//! use deepcopy_cli::rules::{RuleContext, RuleRegistry};
//!
//! let mut fields = Fields::new();
//! fields.set_localized("name", "en-US", FieldValue::text("Hero image"));
//! fields.set_localized("ctaUrl", "en-US", FieldValue::text("https://example.com"));
//! let entry = Entry::new("a1", "toolkitAsset", fields);
//!
//! let registry = RuleRegistry::builtin();
//! let outcome = registry.apply(&entry, &RuleContext::default()).unwrap();
//!
//! assert!(!outcome.skip_copy);
//! assert!(!outcome.fields.contains("ctaUrl"));
//! assert_eq!(outcome.label.as_deref(), Some("Hero image"));
//! ```

pub mod builtin;
pub mod strip;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strsim::levenshtein;

use crate::constants::{
    DEFAULT_DESCRIPTION, DEFAULT_LOCALE, DEFAULT_SYNOPSIS, DEFAULT_TITLE, LOCALIZATION_FIELDS,
};
use crate::models::{Entry, Fields};

pub use builtin::ToolkitRule;
pub use strip::StripRule;

/// Maximum edit distance, as a percentage of the name length, for "did you mean" hints.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// How a cloned toolkit gets its title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleSpec {
    /// Overwrite the title and reset description and synopsis to placeholders.
    Replace(String),
    /// Append ` <tag>` to the existing title; description and synopsis are kept.
    Suffix(String),
}

impl Default for TitleSpec {
    fn default() -> Self {
        Self::Replace(DEFAULT_TITLE.to_string())
    }
}

/// What to do with entries whose content type has no registered rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UnrecognizedPolicy {
    /// Copy the entry with only the cross-cutting cleanup applied.
    #[default]
    Clone,
    /// Leave the original in place and keep links pointing at it.
    Link,
    /// Fail the clone before anything is created.
    Reject,
}

impl fmt::Display for UnrecognizedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clone => f.write_str("clone"),
            Self::Link => f.write_str("link"),
            Self::Reject => f.write_str("reject"),
        }
    }
}

/// Presentation options handed to every rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleContext {
    /// Locale labels are read from and overwritten fields are written to.
    pub locale: String,
    /// Title handling for toolkits.
    pub title: TitleSpec,
    /// Placeholder description for replaced toolkits.
    pub default_description: String,
    /// Placeholder synopsis for replaced toolkits.
    pub default_synopsis: String,
}

impl Default for RuleContext {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            title: TitleSpec::default(),
            default_description: DEFAULT_DESCRIPTION.to_string(),
            default_synopsis: DEFAULT_SYNOPSIS.to_string(),
        }
    }
}

impl RuleContext {
    /// Context using `title` and defaults for everything else.
    #[must_use]
    pub fn with_title(title: TitleSpec) -> Self {
        Self {
            title,
            ..Self::default()
        }
    }
}

/// Result of applying a rule to one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    /// Fields to create the clone with.
    pub fields: Fields,
    /// Entry is traversed but never copied.
    pub skip_copy: bool,
    /// Human-readable name for progress logs.
    pub label: Option<String>,
}

/// A content-type-specific field transformation.
///
/// Applying a rule to its own output must not fail and must not bring back
/// a field it removed. Rules that only strip yield the same fields again; a
/// title suffix is appended once more.
pub trait TransformRule: Send + Sync + fmt::Debug {
    /// Transform `fields` for cloning.
    fn apply(&self, fields: Fields, ctx: &RuleContext) -> RuleOutcome;
}

/// Content type → rule dispatch table.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    rules: HashMap<String, Arc<dyn TransformRule>>,
    cleanup: Vec<String>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleRegistry {
    /// Registry with no rules; only the cross-cutting cleanup is configured.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
            cleanup: LOCALIZATION_FIELDS.iter().map(|field| (*field).to_string()).collect(),
        }
    }

    /// Registry with the toolkit content model rules.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        builtin::register_defaults(&mut registry);
        registry
    }

    /// Register `rule` for `content_type`, returning the rule it replaced.
    pub fn register(
        &mut self,
        content_type: impl Into<String>,
        rule: impl TransformRule + 'static,
    ) -> Option<Arc<dyn TransformRule>> {
        self.rules.insert(content_type.into(), Arc::new(rule))
    }

    /// Rule for `content_type`.
    #[must_use]
    pub fn get(&self, content_type: &str) -> Option<&Arc<dyn TransformRule>> {
        self.rules.get(content_type)
    }

    /// Whether `content_type` has a rule.
    #[must_use]
    pub fn contains(&self, content_type: &str) -> bool {
        self.rules.contains_key(content_type)
    }

    /// Registered content types, sorted.
    #[must_use]
    pub fn content_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Closest registered content type to `content_type`, for typo hints.
    #[must_use]
    pub fn suggest(&self, content_type: &str) -> Option<&str> {
        let limit = content_type.len() * SIMILARITY_THRESHOLD_PERCENT / 100;
        self.rules
            .keys()
            .map(|known| (known.as_str(), levenshtein(content_type, known)))
            .filter(|(_, distance)| *distance <= limit)
            .min_by(|(a_name, a), (b_name, b)| a.cmp(b).then_with(|| a_name.cmp(b_name)))
            .map(|(known, _)| known)
    }

    /// Apply the rule for `entry.content_type` plus cleanup.
    ///
    /// Returns `None` if no rule is registered. A rule that produces no label
    /// gets the entry id instead.
    #[must_use]
    pub fn apply(&self, entry: &Entry, ctx: &RuleContext) -> Option<RuleOutcome> {
        let rule = self.rules.get(&entry.content_type)?;
        let mut outcome = rule.apply(entry.fields.clone(), ctx);
        if !outcome.skip_copy {
            self.cleanup(&mut outcome.fields);
        }
        outcome.label.get_or_insert_with(|| entry.id.to_string());
        Some(outcome)
    }

    /// Outcome for an entry without a rule: copied as-is (plus cleanup) or linked.
    #[must_use]
    pub fn passthrough(&self, entry: &Entry, skip_copy: bool) -> RuleOutcome {
        let mut fields = entry.fields.clone();
        if !skip_copy {
            self.cleanup(&mut fields);
        }
        RuleOutcome {
            fields,
            skip_copy,
            label: Some(entry.id.to_string()),
        }
    }

    fn cleanup(&self, fields: &mut Fields) {
        for field in &self.cleanup {
            fields.remove(field);
        }
    }
}
