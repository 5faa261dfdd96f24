//! User configuration for deepcopy.
//!
//! The configuration file holds the CMS credentials and the defaults every
//! clone starts from. It lives outside any project directory because it
//! carries an access token.
//!
//! # Location
//!
//! - **Unix/macOS**: `~/.deepcopy/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\deepcopy\config.toml`
//! - **Override**: `--config <path>` or the `DEEPCOPY_CONFIG` environment variable
//!
//! # File Format
//!
//! ```toml
//! [cms]
//! space_id = "abc123"
//! environment = "master"
//! access_token = "CFPAT-..."
//! request_delay_ms = 100
//! max_retries = 5
//!
//! [clone]
//! locale = "en-US"
//! default_title = "New Toolkit"
//! unrecognized = "clone"
//! max_concurrency = 4
//!
//! # Extra content types, declared as strip rules
//! [rules.landingPage]
//! strip = ["slug"]
//! label_field = "internalName"
//! ```
//!
//! Every key is optional; a missing file yields the defaults.
//!
//! # Security
//!
//! - `DEEPCOPY_ACCESS_TOKEN` takes precedence over `cms.access_token`, so the
//!   token never has to be written to disk
//! - Files written by [`DeepcopyConfig::save_to`] are owner read/write only on Unix
//! - The token is masked in `Debug` output and in `deepcopy config show`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::client::HttpClientConfig;
use crate::constants::{
    ACCESS_TOKEN_ENV, DEFAULT_BASE_URL, DEFAULT_DESCRIPTION, DEFAULT_ENVIRONMENT, DEFAULT_LOCALE,
    DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_RETRIES, DEFAULT_PROGRESS_EVERY, DEFAULT_REQUEST_DELAY_MS,
    DEFAULT_SYNOPSIS, DEFAULT_TIMEOUT_SECS, DEFAULT_TITLE,
};
use crate::core::CloneError;
use crate::pipeline::CloneOptions;
use crate::rules::{RuleRegistry, StripRule, TitleSpec, UnrecognizedPolicy};

/// Placeholder token written by [`DeepcopyConfig::init_example`].
const EXAMPLE_TOKEN: &str = "YOUR_CMA_TOKEN";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepcopyConfig {
    /// CMS connection settings
    pub cms: CmsSettings,

    /// Defaults for clone operations
    #[serde(rename = "clone")]
    pub clone_defaults: CloneSettings,

    /// Extra content-type rules, keyed by content type
    ///
    /// A rule declared here replaces the built-in rule for the same type.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rules: BTreeMap<String, StripRule>,
}

/// `[cms]` section.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsSettings {
    /// API host
    pub base_url: String,
    /// Space holding the toolkits
    pub space_id: String,
    /// Environment within the space
    pub environment: String,
    /// Management API token
    #[serde(skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    /// Pause before every request, in milliseconds
    pub request_delay_ms: u64,
    /// Retries for transient failures
    pub max_retries: usize,
    /// Per-request timeout, in seconds
    pub timeout_secs: u64,
}

impl Default for CmsSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            space_id: String::new(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            access_token: String::new(),
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for CmsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmsSettings")
            .field("base_url", &self.base_url)
            .field("space_id", &self.space_id)
            .field("environment", &self.environment)
            .field("access_token", &mask_token(&self.access_token))
            .field("request_delay_ms", &self.request_delay_ms)
            .field("max_retries", &self.max_retries)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// `[clone]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloneSettings {
    /// Presentation locale
    pub locale: String,
    /// Title for cloned toolkits when neither `--title` nor `--tag` is given
    pub default_title: String,
    /// Placeholder description for replaced toolkits
    pub default_description: String,
    /// Placeholder synopsis for replaced toolkits
    pub default_synopsis: String,
    /// Handling of content types without a rule
    pub unrecognized: UnrecognizedPolicy,
    /// CMS calls in flight per phase
    pub max_concurrency: usize,
    /// Progress granularity
    pub progress_every: usize,
}

impl Default for CloneSettings {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            default_title: DEFAULT_TITLE.to_string(),
            default_description: DEFAULT_DESCRIPTION.to_string(),
            default_synopsis: DEFAULT_SYNOPSIS.to_string(),
            unrecognized: UnrecognizedPolicy::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

/// Mask all but the last four characters of a token.
#[must_use]
pub fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    let visible: String = {
        let chars: Vec<char> = token.chars().collect();
        if chars.len() <= 8 {
            String::new()
        } else {
            chars[chars.len() - 4..].iter().collect()
        }
    };
    format!("***{visible}")
}

impl DeepcopyConfig {
    /// Load from the default location, or defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` when given, otherwise from the default location.
    ///
    /// A missing file is not an error: the defaults are returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or does
    /// not match the expected schema.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        // The file may hold an access token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set secure permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// Platform default path of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or local data) directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("deepcopy")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".deepcopy")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Example configuration written by `deepcopy config init`.
    #[must_use]
    pub fn init_example() -> Self {
        let mut rules = BTreeMap::new();
        rules.insert(
            "landingPage".to_string(),
            StripRule::new().strip(["slug"]).label_field("internalName"),
        );

        Self {
            cms: CmsSettings {
                space_id: "YOUR_SPACE_ID".to_string(),
                access_token: EXAMPLE_TOKEN.to_string(),
                ..CmsSettings::default()
            },
            clone_defaults: CloneSettings::default(),
            rules,
        }
    }

    /// HTTP client settings, with `DEEPCOPY_ACCESS_TOKEN` taking precedence
    /// over the file's token.
    ///
    /// # Errors
    ///
    /// Returns [`CloneError::Config`] if the space id or token is missing.
    pub fn http_config(&self) -> Result<HttpClientConfig, CloneError> {
        self.http_config_with_token(std::env::var(ACCESS_TOKEN_ENV).ok())
    }

    /// [`http_config`](Self::http_config) with an explicit token override.
    ///
    /// # Errors
    ///
    /// Returns [`CloneError::Config`] if the space id or token is missing.
    pub fn http_config_with_token(
        &self,
        token_override: Option<String>,
    ) -> Result<HttpClientConfig, CloneError> {
        let access_token = token_override
            .filter(|token| !token.trim().is_empty())
            .unwrap_or_else(|| self.cms.access_token.clone());

        if self.cms.space_id.trim().is_empty() {
            return Err(CloneError::Config {
                message: "cms.space_id is not set".to_string(),
            });
        }
        if access_token.trim().is_empty() || access_token == EXAMPLE_TOKEN {
            return Err(CloneError::Config {
                message: format!("no access token: set cms.access_token or {ACCESS_TOKEN_ENV}"),
            });
        }

        Ok(HttpClientConfig {
            base_url: self.cms.base_url.clone(),
            space_id: self.cms.space_id.clone(),
            environment: self.cms.environment.clone(),
            access_token,
            request_delay: Duration::from_millis(self.cms.request_delay_ms),
            max_retries: self.cms.max_retries,
            timeout: Duration::from_secs(self.cms.timeout_secs),
        })
    }

    /// Clone options from the `[clone]` section; the title is the configured
    /// default and can be replaced by the caller.
    #[must_use]
    pub fn clone_options(&self) -> CloneOptions {
        let settings = &self.clone_defaults;
        CloneOptions {
            locale: settings.locale.clone(),
            title: TitleSpec::Replace(settings.default_title.clone()),
            default_description: settings.default_description.clone(),
            default_synopsis: settings.default_synopsis.clone(),
            unrecognized: settings.unrecognized,
            max_concurrency: settings.max_concurrency.max(1),
            progress_every: settings.progress_every.max(1),
        }
    }

    /// Built-in rules plus the rules declared in `[rules]`.
    #[must_use]
    pub fn registry(&self) -> RuleRegistry {
        let mut registry = RuleRegistry::builtin();
        for (content_type, rule) in &self.rules {
            if registry.register(content_type.clone(), rule.clone()).is_some() {
                tracing::debug!("Config rule replaces built-in rule for '{content_type}'");
            }
        }
        registry
    }

    /// The configuration with the access token masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut redacted = self.clone();
        redacted.cms.access_token = mask_token(&self.cms.access_token);
        redacted
    }
}
