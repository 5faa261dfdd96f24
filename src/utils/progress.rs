//! Progress events and the sinks that consume them.
//!
//! The clone pipeline reports progress as a stream of [`ProgressEvent`]s pushed
//! into a [`ProgressSink`]. Events are emitted from counter increments (every
//! Nth fetch, creation or update, plus the last one) and at phase boundaries,
//! never from timers, so a fast clone produces the same events as a slow one.
//!
//! # Sinks
//!
//! - [`TracingSink`] - logs each event through `tracing` (the default)
//! - [`TerminalSink`] - draws an `indicatif` bar on stderr
//! - [`ChannelSink`] - forwards events over a tokio channel to an embedding UI
//! - [`NullSink`] - discards everything
//!
//! # Environment Variables
//!
//! - `DEEPCOPY_NO_PROGRESS`: set to a truthy value (`1`, `true`, `yes`) to hide
//!   terminal progress bars; `0`, `false`, `no`, `off` and empty leave them on
//!
//! # Examples
//!
//! ```rust
//! use deepcopy_cli::core::Phase;
//! use deepcopy_cli::utils::progress::ProgressEvent;
//!
//! let event = ProgressEvent::Created { created: 3, total: 10 };
//! assert_eq!(event.to_string(), " - created 3/10 - 30%");
//!
//! let event = ProgressEvent::PhaseFinished { phase: Phase::Discovery, count: 12 };
//! assert_eq!(event.to_string(), " -- Found 12 reference(s) in total");
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedSender;

use crate::constants::NO_PROGRESS_ENV;
use crate::core::Phase;

fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV).is_ok_and(|value| is_truthy(&value))
}

/// Same reading as clap's `FalseyValueParser`, which parses the CLI flag.
fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty()
        || ["0", "false", "no", "off", "n", "f"].iter().any(|falsey| value.eq_ignore_ascii_case(falsey)))
}

/// A progress notification from the clone pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A phase began.
    PhaseStarted {
        /// Phase that began
        phase: Phase,
    },
    /// Entries fetched so far during discovery.
    Discovered {
        /// Entries discovered so far
        found: usize,
    },
    /// Clones created so far.
    Created {
        /// Clones created so far
        created: usize,
        /// Clones that will be created
        total: usize,
    },
    /// Clones relinked and persisted so far.
    Updated {
        /// Clones updated so far
        updated: usize,
        /// Clones that will be updated
        total: usize,
    },
    /// A phase completed successfully.
    PhaseFinished {
        /// Phase that completed
        phase: Phase,
        /// Entries the phase processed
        count: usize,
    },
    /// A phase stopped on an error; no finish event follows.
    PhaseFailed {
        /// Phase that failed
        phase: Phase,
    },
}

fn percent(done: usize, total: usize) -> usize {
    if total == 0 { 100 } else { done * 100 / total }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::PhaseStarted {
                phase: Phase::Discovery,
            } => f.write_str("Finding references recursively..."),
            Self::PhaseStarted {
                phase: Phase::Transform,
            } => f.write_str("Creating new entries..."),
            Self::PhaseStarted {
                phase: Phase::Rewrite,
            } => f.write_str("Updating reference-tree..."),
            Self::Discovered {
                found,
            } => write!(f, " - found {found} entries so far..."),
            Self::Created {
                created,
                total,
            } => write!(f, " - created {created}/{total} - {}%", percent(created, total)),
            Self::Updated {
                updated,
                total,
            } => write!(f, " - updated {updated}/{total} - {}%", percent(updated, total)),
            Self::PhaseFinished {
                phase: Phase::Discovery,
                count,
            } => write!(f, " -- Found {count} reference(s) in total"),
            Self::PhaseFinished {
                phase: Phase::Transform,
                count,
            } => write!(f, " -- Created {count} reference(s)"),
            Self::PhaseFinished {
                phase: Phase::Rewrite,
                ..
            } => f.write_str("Updating done."),
            Self::PhaseFailed {
                phase,
            } => write!(f, " -- {phase} stopped on an error"),
        }
    }
}

/// Receiver of progress events.
///
/// Delivery is one-way: sinks cannot slow the pipeline down or fail it.
pub trait ProgressSink: Send + Sync {
    /// Handle one event.
    fn notify(&self, event: &ProgressEvent);
}

/// Logs events at `info` level under the `progress` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn notify(&self, event: &ProgressEvent) {
        tracing::info!(target: "progress", "{event}");
    }
}

/// Discards events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn notify(&self, _event: &ProgressEvent) {}
}

/// Forwards events to an unbounded tokio channel.
///
/// Events sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    /// Sink sending into `sender`.
    pub fn new(sender: UnboundedSender<ProgressEvent>) -> Self {
        Self {
            sender,
        }
    }
}

impl ProgressSink for ChannelSink {
    fn notify(&self, event: &ProgressEvent) {
        let _ = self.sender.send(*event);
    }
}

/// Draws one `indicatif` bar per phase on stderr.
///
/// Discovery shows a spinner (the total is unknown until it ends); creation
/// and relinking show a bar sized to the clone set.
#[derive(Default)]
pub struct TerminalSink {
    bar: Mutex<Option<ProgressBar>>,
    hidden: bool,
}

impl fmt::Debug for TerminalSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalSink").field("hidden", &self.hidden).finish_non_exhaustive()
    }
}

impl TerminalSink {
    /// Terminal sink; hidden when `no_progress` is set or `DEEPCOPY_NO_PROGRESS` is present.
    #[must_use]
    pub fn new(no_progress: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            hidden: no_progress || is_progress_disabled(),
        }
    }

    fn start(&self, phase: Phase) -> ProgressBar {
        if self.hidden {
            return ProgressBar::hidden();
        }
        match phase {
            Phase::Discovery => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.cyan} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            }
            Phase::Transform | Phase::Rewrite => {
                let bar = ProgressBar::new(0);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("━╸━"),
                );
                bar
            }
        }
    }
}

impl ProgressSink for TerminalSink {
    fn notify(&self, event: &ProgressEvent) {
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };

        match *event {
            ProgressEvent::PhaseStarted {
                phase,
            } => {
                let bar = self.start(phase);
                bar.set_message(event.to_string());
                if let Some(previous) = slot.replace(bar) {
                    previous.finish_and_clear();
                }
            }
            ProgressEvent::Discovered {
                found,
            } => {
                if let Some(bar) = slot.as_ref() {
                    bar.set_position(found as u64);
                    bar.set_message(event.to_string().trim().to_string());
                }
            }
            ProgressEvent::Created {
                created: done,
                total,
            }
            | ProgressEvent::Updated {
                updated: done,
                total,
            } => {
                if let Some(bar) = slot.as_ref() {
                    bar.set_length(total as u64);
                    bar.set_position(done as u64);
                }
            }
            ProgressEvent::PhaseFinished {
                ..
            } => {
                if let Some(bar) = slot.take() {
                    bar.finish_with_message(event.to_string().trim().to_string());
                }
            }
            ProgressEvent::PhaseFailed {
                ..
            } => {
                // the error is printed after this, keep the line clean for it
                if let Some(bar) = slot.take() {
                    bar.finish_and_clear();
                }
            }
        }
    }
}

/// Throttles counter-driven events before they reach a sink.
///
/// Count events are forwarded on every `every`-th increment and on the final
/// one; phase boundaries are always forwarded.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn ProgressSink>,
    every: usize,
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter").field("every", &self.every).finish_non_exhaustive()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink), crate::constants::DEFAULT_PROGRESS_EVERY)
    }
}

impl ProgressReporter {
    /// Reporter forwarding to `sink`; an `every` of 0 is treated as 1.
    pub fn new(sink: Arc<dyn ProgressSink>, every: usize) -> Self {
        Self {
            sink,
            every: every.max(1),
        }
    }

    /// Forward `event` unconditionally.
    pub fn emit(&self, event: ProgressEvent) {
        self.sink.notify(&event);
    }

    /// Forward a counter event if `done` falls on the reporting cadence.
    ///
    /// `total` is `None` while the total is unknown (discovery).
    pub fn tick(&self, done: usize, total: Option<usize>, event: ProgressEvent) {
        if done % self.every == 0 || total == Some(done) {
            self.sink.notify(&event);
        }
    }
}
