//! Global constants used throughout the deepcopy codebase.
//!
//! Defaults for presentation text, CMS access, concurrency and retry
//! parameters live here so the config layer, the CLI and the pipeline agree
//! on them.

use std::time::Duration;

/// Locale under which labels are read and human-facing fields are written.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Title given to a cloned toolkit when the caller supplies none.
pub const DEFAULT_TITLE: &str = "New Toolkit";

/// Placeholder description written into a cloned toolkit.
pub const DEFAULT_DESCRIPTION: &str = "Description";

/// Placeholder synopsis written into a cloned toolkit.
pub const DEFAULT_SYNOPSIS: &str = "Synopsis";

/// Localization-workflow fields stripped from every cloned entry.
pub const LOCALIZATION_FIELDS: [&str; 3] = ["sendForLocalization", "localizedVersion", "localizedDate"];

/// Content Management API host.
pub const DEFAULT_BASE_URL: &str = "https://api.contentful.com";

/// CMS environment used when none is configured.
pub const DEFAULT_ENVIRONMENT: &str = "master";

/// Maximum number of CMS calls in flight per phase.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Emit a progress event every this many counter increments.
pub const DEFAULT_PROGRESS_EVERY: usize = 10;

/// Pause before every CMS request (milliseconds).
///
/// Keeps a large clone under the API's per-second rate limit.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 100;

/// Retries for transient CMS failures (network errors, rate limiting).
pub const DEFAULT_MAX_RETRIES: usize = 5;

/// Per-request timeout for CMS calls (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Base of the exponential retry schedule; delays are `base^n * RETRY_FACTOR_MS`.
pub const RETRY_BASE: u64 = 2;

/// Multiplier applied to the exponential retry schedule (milliseconds): 200ms, 400ms, 800ms...
pub const RETRY_FACTOR_MS: u64 = 100;

/// Cap for a single retry delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(8);

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "DEEPCOPY_CONFIG";

/// Environment variable overriding the CMS access token.
pub const ACCESS_TOKEN_ENV: &str = "DEEPCOPY_ACCESS_TOKEN";

/// Environment variable disabling terminal progress bars.
pub const NO_PROGRESS_ENV: &str = "DEEPCOPY_NO_PROGRESS";
