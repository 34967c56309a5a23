//! Watcher error types.

use std::path::PathBuf;

/// Errors that end a log source.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// Watched file disappeared after it had been read.
    #[error("Watched file deleted: {0}")]
    FileDeleted(PathBuf),

    /// Permission denied accessing file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatcherError {
    /// Classify an error from opening `path`.
    pub(crate) fn from_open(path: &std::path::Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileDeleted(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(err),
        }
    }
}
