//! deepcopy - deep-copy toolkits inside a headless CMS
//!
//! Binary entry point. Parses the command line, runs the selected command and
//! turns any error into a colored message with a suggestion before exiting
//! with status 1.

use anyhow::Result;
use clap::Parser;
use deepcopy_cli::cli;
use deepcopy_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
