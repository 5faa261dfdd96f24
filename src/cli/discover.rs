//! `deepcopy discover`: list what a clone would touch.
//!
//! Runs discovery only and prints how many entries of each content type are
//! reachable from the root, marking types that would be linked rather than
//! copied and types no rule knows about.
//!
//! ```text
//! Discovered 7 entries from 4xTkRoot
//!   contentModule      2
//!   imageMetadata      1
//!   tagLanguage        1  (linked)
//!   toolkit            1
//! ```

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use super::CliConfig;
use crate::client::HttpCmsClient;
use crate::models::{Entry, EntryId};
use crate::pipeline::{Cloner, ReferenceSet};
use crate::rules::{RuleContext, RuleRegistry};
use crate::utils::progress::TerminalSink;

/// Output format for `discover`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Text,
    /// JSON document on stdout
    Json,
}

/// List the entries reachable from a root, without cloning.
#[derive(Args, Debug)]
pub struct DiscoverCommand {
    /// Id of the root entry
    #[arg(value_parser = EntryId::from_str)]
    root: EntryId,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// One row of the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSummary {
    /// Number of entries of this type
    pub count: usize,
    /// Entries are linked, not copied
    pub linked: bool,
    /// No rule is registered for the type
    pub unrecognized: bool,
}

/// JSON form of the summary.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoverySummary {
    /// Root entry id
    pub root: EntryId,
    /// Total entries discovered
    pub total: usize,
    /// Per content type
    pub content_types: BTreeMap<String, TypeSummary>,
}

impl DiscoverySummary {
    /// Summarize `references` against `registry`.
    #[must_use]
    pub fn new(root: &EntryId, references: &ReferenceSet, registry: &RuleRegistry) -> Self {
        let first_of_type: BTreeMap<&str, &Entry> = references
            .iter()
            .fold(BTreeMap::new(), |mut acc, entry| {
                acc.entry(entry.content_type.as_str()).or_insert(entry);
                acc
            });
        let rule_ctx = RuleContext::default();

        let content_types = references
            .count_by_content_type()
            .into_iter()
            .map(|(content_type, count)| {
                let outcome = first_of_type
                    .get(content_type)
                    .and_then(|entry| registry.apply(entry, &rule_ctx));
                let summary = TypeSummary {
                    count,
                    linked: outcome.as_ref().is_some_and(|outcome| outcome.skip_copy),
                    unrecognized: outcome.is_none(),
                };
                (content_type.to_string(), summary)
            })
            .collect();

        Self {
            root: root.clone(),
            total: references.len(),
            content_types,
        }
    }

    fn print_text(&self) {
        println!(
            "Discovered {} {} from {}",
            self.total.to_string().bold(),
            if self.total == 1 {
                "entry"
            } else {
                "entries"
            },
            self.root.as_str().bold()
        );
        let width = self.content_types.keys().map(String::len).max().unwrap_or(0);
        for (content_type, summary) in &self.content_types {
            let note = if summary.unrecognized {
                "  (no rule)".yellow().to_string()
            } else if summary.linked {
                "  (linked)".dimmed().to_string()
            } else {
                String::new()
            };
            println!("  {content_type:<width$}  {:>4}{note}", summary.count);
        }
    }
}

impl DiscoverCommand {
    /// Run discovery and print the summary.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is incomplete or an entry cannot be fetched.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load_config().await?;
        let client = HttpCmsClient::new(config.http_config()?)?;
        let registry = config.registry();

        // JSON goes to stdout untouched
        let no_progress = cli.no_progress || self.format == OutputFormat::Json;
        let references = Cloner::new(&client)
            .with_options(config.clone_options())
            .with_progress(Arc::new(TerminalSink::new(no_progress)))
            .discover_only(&self.root)
            .await?;

        let summary = DiscoverySummary::new(&self.root, &references, &registry);
        match self.format {
            OutputFormat::Text => summary.print_text(),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        }
        Ok(())
    }
}
