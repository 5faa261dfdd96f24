//! Declarative strip-and-label rule.
//!
//! Most content types only need a fixed set of fields removed and a label
//! read from one field. [`StripRule`] covers them, and because it is
//! `Deserialize` the same rule can be declared in the config file:
//!
//! ```toml
//! [rules.landingPage]
//! strip = ["slug", "ctaUrl"]
//! label_field = "internalName"
//!
//! [rules.tagAudience]
//! skip_copy = true
//! ```

use serde::{Deserialize, Serialize};

use super::{RuleContext, RuleOutcome, TransformRule};
use crate::models::Fields;

/// Removes listed fields and reads the label from one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripRule {
    /// Fields removed before the clone is created.
    pub strip: Vec<String>,
    /// Field holding the progress label, read from the presentation locale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_field: Option<String>,
    /// Traverse the entry but never copy it.
    pub skip_copy: bool,
}

impl StripRule {
    /// Rule that keeps every field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add fields to strip.
    #[must_use]
    pub fn strip<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strip.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Read the label from `field`.
    #[must_use]
    pub fn label_field(mut self, field: impl Into<String>) -> Self {
        self.label_field = Some(field.into());
        self
    }

    /// Mark entries of this type as skip-copy.
    #[must_use]
    pub fn skip_copy(mut self, skip_copy: bool) -> Self {
        self.skip_copy = skip_copy;
        self
    }
}

impl TransformRule for StripRule {
    fn apply(&self, mut fields: Fields, ctx: &RuleContext) -> RuleOutcome {
        let label = self
            .label_field
            .as_deref()
            .and_then(|field| fields.text(field, &ctx.locale))
            .map(str::to_string);

        if !self.skip_copy {
            for field in &self.strip {
                fields.remove(field);
            }
        }

        RuleOutcome {
            fields,
            skip_copy: self.skip_copy,
            label,
        }
    }
}
