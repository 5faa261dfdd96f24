//! Supporting utilities.
//!
//! - [`progress`] - progress events and sinks for long-running clones

pub mod progress;

pub use progress::{
    ChannelSink, NullSink, ProgressEvent, ProgressReporter, ProgressSink, TerminalSink, TracingSink,
};
