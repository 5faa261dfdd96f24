//! Mapping errors to user-facing messages.

use super::error::{CloneError, ErrorContext};
use crate::client::ClientError;

const NETWORK_ERROR_KEYWORDS: &[&str] =
    &["error sending request", "connection", "timed out", "dns error", "tls"];

/// Convert any error into an [`ErrorContext`] with a suggestion.
///
/// Recognizes [`CloneError`] anywhere in the chain (so `.context(...)` wrapping
/// from the CLI layer is transparent), then IO and TOML errors, then falls back
/// to the top-level message.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let mut current_error: &dyn std::error::Error = error.as_ref();
    loop {
        if let Some(clone_error) = current_error.downcast_ref::<CloneError>() {
            return create_error_context(clone_error);
        }
        if let Some(client_error) = current_error.downcast_ref::<ClientError>() {
            return client_error_context(
                CloneError::Other {
                    message: client_error.to_string(),
                },
                client_error,
            );
        }

        match current_error.source() {
            Some(source) => current_error = source,
            None => break,
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        let context = ErrorContext::new(CloneError::Other {
            message: format!("{error:#}"),
        });
        return match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => context
                .with_suggestion("Check file permissions on the configuration directory")
                .with_details("deepcopy could not read or write a file it needs"),
            std::io::ErrorKind::NotFound => context
                .with_suggestion("Check that the path exists, or run 'deepcopy config init'"),
            _ => context.with_suggestion("Check file permissions and disk space"),
        };
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return create_error_context(&CloneError::Config {
            message: toml_error.to_string(),
        })
        .with_details("The configuration file is not valid TOML");
    }

    let error_msg = format!("{error:#}");
    if NETWORK_ERROR_KEYWORDS.iter().any(|&keyword| error_msg.to_lowercase().contains(keyword)) {
        return ErrorContext::new(CloneError::Other {
            message: error_msg,
        })
        .with_suggestion("Check your network connection and the configured base_url");
    }

    ErrorContext::new(CloneError::Other {
        message: error_msg,
    })
    .with_suggestion("Re-run with --verbose for more details")
}

/// Build the [`ErrorContext`] for a known [`CloneError`].
#[must_use]
pub fn create_error_context(error: &CloneError) -> ErrorContext {
    let orphan_details = orphan_details(error.orphaned());

    match error {
        CloneError::Fetch {
            id,
            source,
        } => {
            let context = client_error_context(error.clone(), source);
            match source {
                ClientError::NotFound {
                    ..
                } => context.with_details(format!(
                    "Entry '{id}' is linked from the tree but does not exist in the configured space/environment"
                )),
                _ => context,
            }
        }
        CloneError::Create {
            source, ..
        } => {
            let context = client_error_context(error.clone(), source);
            match orphan_details {
                Some(details) => context.with_details(details),
                None => context,
            }
        }
        CloneError::Update {
            source, ..
        } => {
            let relinking = "clones not yet updated still link to the original entries";
            client_error_context(error.clone(), source).with_details(match orphan_details {
                Some(details) => format!("{details}; {relinking}"),
                None => format!("All clones were created; {relinking}"),
            })
        }
        CloneError::Cancelled {
            ..
        } => {
            let context = ErrorContext::new(error.clone());
            match orphan_details {
                Some(details) => context.with_details(details),
                None => context.with_details("No clones were created"),
            }
        }
        CloneError::RootNotCloned {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Pass the id of a toolkit (or another copied content type) as the root"),
        CloneError::UnrecognizedContentType {
            content_type, ..
        } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Add a [rules.{content_type}] section to the config file, or re-run with --unrecognized clone"
            ))
            .with_details("Nothing was created"),
        CloneError::Config {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Run 'deepcopy config init' and fill in the [cms] section, or check 'deepcopy config show'"),
        CloneError::Io(_) | CloneError::Toml(_) | CloneError::Other {
            ..
        } => ErrorContext::new(error.clone()),
    }
}

fn client_error_context(error: CloneError, source: &ClientError) -> ErrorContext {
    let context = ErrorContext::new(error);
    match source {
        ClientError::NotFound {
            ..
        } => context.with_suggestion("Check the entry id and that your token can read the space"),
        ClientError::Network {
            ..
        } => context.with_suggestion("Check your network connection and the configured base_url"),
        ClientError::Validation {
            ..
        } => context.with_suggestion(
            "The CMS rejected the transformed fields; adjust the strip list for this content type",
        ),
        ClientError::Conflict {
            ..
        } => context
            .with_suggestion("Another editor changed the clone while it was being relinked; re-run the clone"),
        ClientError::RateLimited {
            ..
        } => {
            let wait = source.retry_after().map_or(1, |wait| wait.as_secs());
            context.with_suggestion(format!(
                "The CMS asked to wait {wait}s; increase cms.request_delay_ms or lower --max-parallel"
            ))
        }
    }
}

fn orphan_details(orphaned: &[crate::models::EntryId]) -> Option<String> {
    if orphaned.is_empty() {
        return None;
    }
    let ids: Vec<&str> = orphaned.iter().map(|id| id.as_str()).collect();
    Some(format!(
        "{} clone(s) were created before the failure and were not removed: {}",
        ids.len(),
        ids.join(", ")
    ))
}
