//! Commands sent to the managed server.

mod screen;

pub use screen::*;

use async_trait::async_trait;

/// Error type for server commands.
#[derive(thiserror::Error, Debug)]
pub enum ControllerError {
    /// The session tool binary was not found.
    #[error("Session binary not found: {0}")]
    NotFound(String),
    /// Permission denied when spawning.
    #[error("Permission denied")]
    PermissionDenied,
    /// The command ran but reported failure.
    #[error("{command} failed with status {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ControllerError {
    /// Create a `ControllerError` from a spawn error, classifying common cases.
    fn from_io(binary: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(binary.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io(err),
        }
    }
}

/// A command issued to the managed server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    Start,
    Stop,
    /// Chat announcement shown to every player.
    Broadcast(String),
}

impl ServerCommand {
    /// Console line typed into the server for this command, if any.
    #[must_use]
    pub fn console_line(&self) -> Option<String> {
        match self {
            Self::Start => None,
            Self::Stop => Some("/stop\n".to_string()),
            Self::Broadcast(message) => Some(format!("/announce {message}\n")),
        }
    }
}

/// Starts, stops and talks to the managed server.
///
/// Implementations report failures; callers treat them as non-fatal.
#[async_trait]
pub trait ProcessController: Send + Sync {
    /// Launch the server.
    async fn start(&self) -> Result<(), ControllerError>;

    /// Ask the server to shut down.
    async fn stop(&self) -> Result<(), ControllerError>;

    /// Announce a message in the server chat.
    async fn broadcast(&self, message: &str) -> Result<(), ControllerError>;
}
