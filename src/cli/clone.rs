//! `deepcopy clone`: deep-copy a toolkit.
//!
//! Runs discovery, transformation and relinking against the configured
//! space and prints the id of the new toolkit. With `--dry-run` every read
//! goes to the CMS but creations and updates are faked, so the run shows
//! what would be created without writing anything.
//!
//! Ctrl-C stops the clone at the next CMS call; clones created up to that
//! point are listed so they can be removed by hand.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::str::FromStr;
use std::sync::Arc;

use super::CliConfig;
use crate::client::{CmsClient, DryRunClient, HttpCmsClient};
use crate::config::DeepcopyConfig;
use crate::core::CancellationFlag;
use crate::models::EntryId;
use crate::pipeline::{CloneOptions, CloneReport, Cloner};
use crate::rules::{RuleRegistry, TitleSpec, UnrecognizedPolicy};
use crate::utils::progress::TerminalSink;

/// Clone a toolkit and everything it references.
#[derive(Args, Debug)]
pub struct CloneCommand {
    /// Id of the toolkit entry to clone
    #[arg(value_parser = EntryId::from_str)]
    root: EntryId,

    /// Title of the new toolkit; description and synopsis are reset
    #[arg(long, conflicts_with = "tag")]
    title: Option<String>,

    /// Keep the title and append this tag to it
    #[arg(long)]
    tag: Option<String>,

    /// Locale labels are read from and titles are written to
    #[arg(long)]
    locale: Option<String>,

    /// What to do with content types that have no rule
    #[arg(long, value_enum)]
    unrecognized: Option<UnrecognizedPolicy>,

    /// Maximum CMS calls in flight per phase
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    max_parallel: Option<u16>,

    /// Read from the CMS but fake every write
    #[arg(long)]
    dry_run: bool,
}

impl CloneCommand {
    /// Run the clone.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is incomplete or any phase fails.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load_config().await?;
        let options = self.options(&config);
        let registry = config.registry();
        let http = HttpCmsClient::new(config.http_config()?)
            .context("Failed to set up the CMS client")?;

        let report = if self.dry_run {
            println!("{}", "Dry run: nothing will be written".yellow());
            let client = DryRunClient::new(http);
            run(&client, &self.root, options, registry, cli.no_progress).await?
        } else {
            run(&http, &self.root, options, registry, cli.no_progress).await?
        };

        print_report(&self.root, &report, self.dry_run);
        Ok(())
    }

    /// Clone options: flags over the `[clone]` section.
    fn options(&self, config: &DeepcopyConfig) -> CloneOptions {
        let mut options = config.clone_options();
        if let Some(title) = &self.title {
            options.title = TitleSpec::Replace(title.clone());
        } else if let Some(tag) = &self.tag {
            options.title = TitleSpec::Suffix(tag.clone());
        }
        if let Some(locale) = &self.locale {
            options.locale.clone_from(locale);
        }
        if let Some(policy) = self.unrecognized {
            options.unrecognized = policy;
        }
        if let Some(max_parallel) = self.max_parallel {
            options.max_concurrency = usize::from(max_parallel);
        }
        options
    }
}

async fn run<C: CmsClient>(
    client: &C,
    root: &EntryId,
    options: CloneOptions,
    registry: RuleRegistry,
    no_progress: bool,
) -> Result<CloneReport> {
    let cancel = CancellationFlag::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping at the next CMS call...");
                cancel.cancel();
            }
        })
    };

    let result = Cloner::new(client)
        .with_options(options)
        .with_registry(registry)
        .with_progress(Arc::new(TerminalSink::new(no_progress)))
        .with_cancellation(cancel)
        .run(root)
        .await;
    watcher.abort();

    Ok(result?)
}

fn print_report(root: &EntryId, report: &CloneReport, dry_run: bool) {
    let verb = if dry_run {
        "Would clone"
    } else {
        "Cloned"
    };
    println!(
        "{} {} {} {}",
        "✓".green(),
        verb,
        root.as_str().bold(),
        format!("→ {}", report.root.id).cyan()
    );
    println!(
        "  {} discovered, {} created, {} relinked, {} linked to the original",
        report.discovered,
        report.created,
        report.updated,
        report.skipped.len()
    );
    for (original, clone) in report.clones.iter() {
        tracing::debug!("{original} → {} ({})", clone.id, clone.content_type);
    }
}
