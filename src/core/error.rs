//! Error handling for deepcopy
//!
//! Two layers, mirroring how errors travel through the tool:
//!
//! - [`CloneError`] - typed failures of a clone invocation, each naming the
//!   entry and phase involved and, where clones were already created, the
//!   orphaned ids an operator has to clean up by hand
//! - [`ErrorContext`] - wraps a [`CloneError`] with details and an actionable
//!   suggestion for display in the terminal
//!
//! Nothing is rolled back on failure: entries created before the failure stay
//! in the CMS. Every variant that can leave such entries behind carries them
//! in an `orphaned` list.
//!
//! # Examples
//!
//! ```rust,no_run
//! use deepcopy_cli::core::{CloneError, user_friendly_error};
//! use deepcopy_cli::models::EntryId;
//!
//! let error = CloneError::RootNotCloned {
//!     id: EntryId::new("t1"),
//!     content_type: "tagRegion".to_string(),
//! };
//! user_friendly_error(anyhow::Error::from(error)).display();
//! ```

use std::fmt;

use colored::Colorize;
use thiserror::Error;

use super::Phase;
use crate::client::ClientError;
use crate::models::EntryId;

/// Failures of a clone invocation.
#[derive(Error, Debug)]
pub enum CloneError {
    /// Discovery could not fetch an entry.
    #[error("Failed to fetch entry '{id}': {source}")]
    Fetch {
        /// Entry being fetched
        id: EntryId,
        /// Client failure
        #[source]
        source: ClientError,
    },

    /// Creating a clone failed; creation stopped.
    #[error("Failed to create clone of {content_type} '{original_id}': {source}")]
    Create {
        /// Entry being cloned
        original_id: EntryId,
        /// Its content type
        content_type: String,
        /// Clones created before the failure
        orphaned: Vec<EntryId>,
        /// Client failure
        #[source]
        source: ClientError,
    },

    /// Persisting a relinked clone failed; relinking stopped.
    #[error("Failed to update clone '{clone_id}' of '{original_id}': {source}")]
    Update {
        /// Original entry
        original_id: EntryId,
        /// Clone being updated
        clone_id: EntryId,
        /// Every clone created, none of which is fully relinked
        orphaned: Vec<EntryId>,
        /// Client failure
        #[source]
        source: ClientError,
    },

    /// The invocation was cancelled.
    #[error("Clone cancelled during {phase}")]
    Cancelled {
        /// Phase that observed the cancellation
        phase: Phase,
        /// Clones created before the cancellation
        orphaned: Vec<EntryId>,
    },

    /// The root entry is linked rather than copied, so there is nothing to return.
    #[error("Root entry '{id}' has content type '{content_type}', which is never copied")]
    RootNotCloned {
        /// Root entry id
        id: EntryId,
        /// Its content type
        content_type: String,
    },

    /// An entry has a content type without a rule and the policy is `reject`.
    #[error("Entry '{id}' has unrecognized content type '{content_type}'")]
    UnrecognizedContentType {
        /// Offending entry
        id: EntryId,
        /// Its content type
        content_type: String,
    },

    /// Configuration is missing or invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl CloneError {
    /// Clones created before the failure and left in the CMS.
    #[must_use]
    pub fn orphaned(&self) -> &[EntryId] {
        match self {
            Self::Create {
                orphaned, ..
            }
            | Self::Update {
                orphaned, ..
            }
            | Self::Cancelled {
                orphaned, ..
            } => orphaned,
            _ => &[],
        }
    }

    /// Client failure behind this error, if any.
    #[must_use]
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            Self::Fetch {
                source, ..
            }
            | Self::Create {
                source, ..
            }
            | Self::Update {
                source, ..
            } => Some(source),
            _ => None,
        }
    }
}

impl Clone for CloneError {
    fn clone(&self) -> Self {
        match self {
            Self::Fetch {
                id,
                source,
            } => Self::Fetch {
                id: id.clone(),
                source: source.clone(),
            },
            Self::Create {
                original_id,
                content_type,
                orphaned,
                source,
            } => Self::Create {
                original_id: original_id.clone(),
                content_type: content_type.clone(),
                orphaned: orphaned.clone(),
                source: source.clone(),
            },
            Self::Update {
                original_id,
                clone_id,
                orphaned,
                source,
            } => Self::Update {
                original_id: original_id.clone(),
                clone_id: clone_id.clone(),
                orphaned: orphaned.clone(),
                source: source.clone(),
            },
            Self::Cancelled {
                phase,
                orphaned,
            } => Self::Cancelled {
                phase: *phase,
                orphaned: orphaned.clone(),
            },
            Self::RootNotCloned {
                id,
                content_type,
            } => Self::RootNotCloned {
                id: id.clone(),
                content_type: content_type.clone(),
            },
            Self::UnrecognizedContentType {
                id,
                content_type,
            } => Self::UnrecognizedContentType {
                id: id.clone(),
                content_type: content_type.clone(),
            },
            Self::Config {
                message,
            } => Self::Config {
                message: message.clone(),
            },
            // Source errors that don't implement Clone become Other
            Self::Io(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::Toml(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// A [`CloneError`] dressed up for the terminal.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: CloneError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Context with no details or suggestion.
    #[must_use]
    pub const fn new(error: CloneError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add an actionable suggestion, shown in green.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error, shown in yellow.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details and suggestion to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}
