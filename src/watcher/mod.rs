//! Server log watching.
//!
//! Tails the server's main log from the moment a launch begins and hands
//! each new line to the rest of the panel.

mod error;
mod log_source;
mod tailer;

pub use error::WatcherError;
pub use log_source::{LogLines, LogSource, DEFAULT_LINE_BUFFER};
pub use tailer::LogTailer;
