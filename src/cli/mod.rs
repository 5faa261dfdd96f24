//! Command-line interface for deepcopy.
//!
//! # Available Commands
//!
//! - `clone` - deep-copy a toolkit and everything it references
//! - `discover` - list what a clone would touch, without writing anything
//! - `config` - create, inspect and locate the configuration file
//!
//! # Examples
//!
//! ```bash
//! # Clone with a new title
//! deepcopy clone 4xTkRoot --title "Autumn Launch"
//!
//! # Keep the title, append a tag
//! deepcopy clone 4xTkRoot --tag "(copy)"
//!
//! # See what would be cloned
//! deepcopy discover 4xTkRoot --format json
//!
//! # Rehearse a clone: reads are real, writes are faked
//! deepcopy --verbose clone 4xTkRoot --dry-run
//! ```
//!
//! # Global Options
//!
//! - `--verbose` / `--quiet` - log level (`debug` / errors only)
//! - `--config <path>` - configuration file (also `DEEPCOPY_CONFIG`)
//! - `--no-progress` - plain log lines instead of progress bars (also `DEEPCOPY_NO_PROGRESS`)

mod clone;
mod config;
mod discover;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::DeepcopyConfig;
use crate::constants::{CONFIG_PATH_ENV, NO_PROGRESS_ENV};

pub use clone::CloneCommand;
pub use config::ConfigCommand;
pub use discover::{DiscoverCommand, OutputFormat};

/// Settings shared by every command, derived from the global flags.
///
/// Passed explicitly instead of through environment variables so commands
/// can be driven from tests.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` keeps only errors.
    pub log_level: Option<String>,

    /// Disable progress bars.
    pub no_progress: bool,

    /// Configuration file path; `None` means the platform default.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Defaults: no log level, progress bars on, default config path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global `tracing` subscriber.
    ///
    /// `RUST_LOG` wins over the flags when set. Logs go to stderr so command
    /// output on stdout stays machine readable. Calling this twice is harmless.
    pub fn init_tracing(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(self.log_level.as_deref().unwrap_or("error"))
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .try_init();
    }

    /// Load the configuration file this invocation points at.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_config(&self) -> Result<DeepcopyConfig> {
        DeepcopyConfig::load_with_optional(self.config_path.clone()).await
    }

    /// Path of the configuration file, resolved to the default when unset.
    ///
    /// # Errors
    ///
    /// Returns an error if no default location can be determined.
    pub fn resolved_config_path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => DeepcopyConfig::default_path(),
        }
    }
}

/// Deep-copy toolkits inside a headless CMS.
#[derive(Parser, Debug)]
#[command(
    name = "deepcopy",
    about = "Deep-copy a toolkit and everything it references",
    version,
    long_about = "deepcopy clones a toolkit entry together with every entry it links to, \
                  transforming each copy per content type and relinking the copies to each other."
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Disable progress bars
    #[arg(
        long,
        global = true,
        env = NO_PROGRESS_ENV,
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone a toolkit and everything it references
    Clone(CloneCommand),

    /// List the entries reachable from a root, without cloning
    Discover(DiscoverCommand),

    /// Manage the configuration file
    Config(ConfigCommand),
}

impl Cli {
    /// Run the selected command with settings from the global flags.
    ///
    /// # Errors
    ///
    /// Propagates the command's error.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_tracing();
        self.execute_with_config(config).await
    }

    /// Settings derived from the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress || self.quiet,
            config_path: self.config.clone(),
        }
    }

    /// Run the selected command with explicit settings.
    ///
    /// # Errors
    ///
    /// Propagates the command's error.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Clone(cmd) => cmd.execute(&config).await,
            Commands::Discover(cmd) => cmd.execute(&config).await,
            Commands::Config(cmd) => cmd.execute(&config).await,
        }
    }
}
