//! deepcopy - deep-copy a toolkit and everything it references inside a
//! headless CMS.
//!
//! A toolkit in the CMS is a root entry linking to modules, assets, image
//! metadata and tags, which in turn link to more entries. Cloning one by hand
//! means recreating every reachable entry and pointing each copy at the other
//! copies. This crate does that in three phases:
//!
//! 1. **Discovery** walks entry links from the root and fetches every
//!    reachable entry exactly once, cycles included
//! 2. **Transformation** applies the rule registered for each content type
//!    (strip fields, retitle the toolkit, or mark the entry as shared) and
//!    creates the copies
//! 3. **Relinking** rewrites every entry link inside the copies to point at
//!    the matching copy and persists them
//!
//! Entries whose rule marks them skip-copy, such as region and language
//! tags, are never copied; the copies keep linking to the originals.
//!
//! # Modules
//!
//! - [`pipeline`] - the three phases and the [`pipeline::Cloner`] driving them
//! - [`rules`] - per-content-type transformations and their registry
//! - [`client`] - the [`client::CmsClient`] contract, HTTP and dry-run clients
//! - [`models`] - entries, localized fields and links
//! - [`core`] - errors, user-facing error formatting, per-run context
//! - [`config`] - the TOML configuration file
//! - [`cli`] - the `deepcopy` command line
//! - [`utils`] - progress reporting
//! - [`constants`] - shared defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use deepcopy_cli::client::HttpCmsClient;
//! use deepcopy_cli::config::DeepcopyConfig;
//! use deepcopy_cli::models::EntryId;
//! use deepcopy_cli::pipeline::Cloner;
//! use deepcopy_cli::rules::TitleSpec;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = DeepcopyConfig::load().await?;
//! let client = HttpCmsClient::new(config.http_config()?)?;
//!
//! let mut options = config.clone_options();
//! options.title = TitleSpec::Suffix("(copy)".into());
//!
//! let report = Cloner::new(&client)
//!     .with_options(options)
//!     .with_registry(config.registry())
//!     .run(&EntryId::new("4xTkRoot"))
//!     .await?;
//! println!("{} entries copied, new root {}", report.created, report.root.id);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod core;
pub mod models;
pub mod pipeline;
pub mod rules;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
