//! Incremental log file tailer.
//!
//! Reads lines as they are appended to the server log.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::time::Instant;

use super::error::WatcherError;

/// How long a log that vanished may stay missing before the tailer gives up.
pub const DEFAULT_MISSING_GRACE: Duration = Duration::from_secs(30);

/// Incremental log reader that tracks read position.
///
/// Only complete, newline-terminated lines are consumed; a partially
/// written tail stays in the file until its newline arrives.
#[derive(Debug)]
pub struct LogTailer {
    /// Path to the log file.
    path: PathBuf,
    /// Current byte offset in the file.
    offset: u64,
    /// Whether the current file has been opened.
    seen: bool,
    /// When a previously seen file went missing.
    vanished_at: Option<Instant>,
    /// Allowed time for a vanished file to reappear.
    missing_grace: Duration,
}

impl LogTailer {
    /// Create a tailer positioned at the current end of `path`.
    ///
    /// Lines already in the file are never returned. A file that does not
    /// exist yet is read from its beginning once it appears.
    pub async fn attach(path: PathBuf) -> Self {
        match tokio::fs::metadata(&path).await {
            Ok(metadata) => Self {
                path,
                offset: metadata.len(),
                seen: true,
                vanished_at: None,
                missing_grace: DEFAULT_MISSING_GRACE,
            },
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %e,
                    "Log file not present yet, waiting for it"
                );
                Self {
                    path,
                    offset: 0,
                    seen: false,
                    vanished_at: None,
                    missing_grace: DEFAULT_MISSING_GRACE,
                }
            }
        }
    }

    /// Set how long a vanished log may stay missing.
    #[must_use]
    pub fn with_missing_grace(mut self, grace: Duration) -> Self {
        self.missing_grace = grace;
        self
    }

    /// Get the current byte offset.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Get the path being tailed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read lines appended since the last read.
    ///
    /// Lines are trimmed and empty ones skipped. Invalid UTF-8 is replaced
    /// rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file disappeared after it had been seen, or permission is denied
    /// - I/O errors occur during reading
    ///
    /// If the file is truncated (smaller than our offset), the offset is
    /// reset to 0 and reading starts from the beginning.
    pub async fn read_new_lines(&mut self) -> Result<Vec<String>, WatcherError> {
        let file = match File::open(&self.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return self.on_missing(e),
            Err(e) => return Err(WatcherError::from_open(&self.path, e)),
        };
        if self.vanished_at.take().is_some() {
            tracing::info!(path = %self.path.display(), "Log file reappeared");
        }
        self.seen = true;

        let file_len = file.metadata().await?.len();

        if file_len < self.offset {
            tracing::warn!(
                path = %self.path.display(),
                old_offset = self.offset,
                new_len = file_len,
                "Log truncated, resetting offset to 0"
            );
            self.offset = 0;
        }

        if file_len == self.offset {
            return Ok(Vec::new());
        }

        let mut file = file;
        file.seek(std::io::SeekFrom::Start(self.offset)).await?;

        let mut reader = BufReader::new(file);
        let mut lines = Vec::new();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let bytes_read = reader.read_until(b'\n', &mut buf).await?;

            if bytes_read == 0 || buf.last() != Some(&b'\n') {
                // EOF, or a line still being written
                break;
            }

            self.offset += bytes_read as u64;

            let text = String::from_utf8_lossy(&buf);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }

        Ok(lines)
    }

    /// Handle a missing log file.
    ///
    /// A file that never existed is waited for indefinitely. One that
    /// vanished after being read (rotation) is read from its start once it
    /// is recreated, unless it stays missing past the grace period.
    fn on_missing(&mut self, err: std::io::Error) -> Result<Vec<String>, WatcherError> {
        if self.seen {
            tracing::warn!(
                path = %self.path.display(),
                grace = ?self.missing_grace,
                "Log file vanished, waiting for it to reappear"
            );
            self.seen = false;
            self.offset = 0;
            self.vanished_at = Some(Instant::now());
            return Ok(Vec::new());
        }

        match self.vanished_at {
            Some(since) if since.elapsed() >= self.missing_grace => {
                Err(WatcherError::from_open(&self.path, err))
            }
            _ => Ok(Vec::new()),
        }
    }
}
