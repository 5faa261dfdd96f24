//! Test utilities for deepcopy
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suites:
//!
//! - [`InMemoryCmsClient`] - a [`CmsClient`](crate::client::CmsClient) backed by
//!   a map, with call counters and failure injection
//! - [`EntryBuilder`] / [`GraphBuilder`] - terse construction of entries and
//!   link graphs
//! - [`sample_toolkit`] - a realistic toolkit tree covering every built-in type
//!
//! # Example
//!
//! ```rust,no_run
//! use deepcopy_cli::models::EntryId;
//! use deepcopy_cli::pipeline::clone_tree;
//! use deepcopy_cli::rules::TitleSpec;
//! use deepcopy_cli::test_utils::{EntryBuilder, InMemoryCmsClient};
//!
//! # async fn example() {
//! let client = InMemoryCmsClient::new();
//! client.insert(EntryBuilder::new("root", "toolkit").link("hero", "asset").build());
//! client.insert(EntryBuilder::new("asset", "toolkitAsset").text("name", "Hero").build());
//!
//! let clone = clone_tree(&client, &EntryId::new("root"), TitleSpec::default()).await.unwrap();
//! assert_ne!(clone.id, EntryId::new("root"));
//! # }
//! ```

pub mod fixtures;
pub mod memory;

pub use fixtures::{EntryBuilder, GraphBuilder, sample_toolkit};
pub use memory::InMemoryCmsClient;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` if given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=discovery=debug,transform=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
