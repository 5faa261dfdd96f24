//! Configuration management for deepcopy.
//!
//! One TOML file per user holds the CMS credentials, clone defaults and extra
//! content-type rules; see [`DeepcopyConfig`] for the format and location.
//!
//! Precedence, highest first:
//!
//! 1. Command-line flags (`--title`, `--locale`, `--max-parallel`, ...)
//! 2. Environment variables (`DEEPCOPY_CONFIG`, `DEEPCOPY_ACCESS_TOKEN`)
//! 3. The configuration file
//! 4. Built-in defaults from [`crate::constants`]

mod global;

pub use global::{CloneSettings, CmsSettings, DeepcopyConfig, mask_token};
