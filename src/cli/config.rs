//! `deepcopy config`: manage the configuration file.
//!
//! ```bash
//! deepcopy config init      # write an example file
//! deepcopy config show      # print the effective configuration, token masked
//! deepcopy config path      # print where the file is read from
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use super::CliConfig;
use crate::config::DeepcopyConfig;
use crate::constants::ACCESS_TOKEN_ENV;

/// Manage the configuration file.
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommands {
    /// Write an example configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration (default)
    Show,

    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    /// Run the subcommand.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, parsed or written.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        match self.command {
            Some(ConfigSubcommands::Init {
                force,
            }) => Self::init(cli, force).await,
            Some(ConfigSubcommands::Show) | None => Self::show(cli).await,
            Some(ConfigSubcommands::Path) => Self::path(cli),
        }
    }

    async fn init(cli: &CliConfig, force: bool) -> Result<()> {
        let path = cli.resolved_config_path()?;
        if path.exists() && !force {
            println!("{} Config already exists at: {}", "✗".red(), path.display());
            println!("   Use --force to overwrite");
            return Ok(());
        }

        let config = DeepcopyConfig::init_example();
        config.save_to(&path).await?;

        println!("{} Created config at: {}", "✓".green(), path.display());
        println!("\n{}", "Next steps:".yellow());
        println!("  1. Set cms.space_id to the space holding your toolkits");
        println!("  2. Replace 'YOUR_CMA_TOKEN', or export {ACCESS_TOKEN_ENV} instead");
        Ok(())
    }

    async fn show(cli: &CliConfig) -> Result<()> {
        let path = cli.resolved_config_path()?;
        let config = cli.load_config().await?;

        println!("{}", "Configuration".bold());
        if path.exists() {
            println!("Location: {}\n", path.display());
        } else {
            println!("Location: {} {}\n", path.display(), "(not found, using defaults)".dimmed());
        }
        println!("{}", toml::to_string_pretty(&config.redacted())?);
        if std::env::var(ACCESS_TOKEN_ENV).is_ok() {
            println!("{}", format!("Access token overridden by {ACCESS_TOKEN_ENV}").dimmed());
        }
        Ok(())
    }

    fn path(cli: &CliConfig) -> Result<()> {
        println!("{}", cli.resolved_config_path()?.display());
        Ok(())
    }
}
