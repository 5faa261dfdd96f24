//! Core types shared by every layer of deepcopy
//!
//! # Modules
//!
//! - `error` - [`CloneError`], the failure taxonomy of a clone invocation, and
//!   [`ErrorContext`] for terminal display
//! - `error_formatting` - [`user_friendly_error`], mapping any error to an
//!   [`ErrorContext`] with an actionable suggestion
//! - `operation_context` - [`CloneContext`], the per-invocation state (claimed
//!   ids, fetched entries, counters, cancellation)
//!
//! # Error Handling Pattern
//!
//! ```rust,no_run
//! use deepcopy_cli::core::{CloneError, user_friendly_error};
//!
//! fn run() -> anyhow::Result<()> {
//!     Err(CloneError::Config { message: "space_id is not set".into() }.into())
//! }
//!
//! if let Err(e) = run() {
//!     user_friendly_error(e).display();
//! }
//! ```

pub mod error;
pub mod error_formatting;
pub mod operation_context;

pub use error::{CloneError, ErrorContext};
pub use error_formatting::{create_error_context, user_friendly_error};
pub use operation_context::{CancellationFlag, CloneContext, Counters, Phase};
