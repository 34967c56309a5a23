//! Per-launch log line source.
//!
//! Polls the log file on its own task, woken early by file system
//! notifications when they are available.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use super::error::WatcherError;
use super::tailer::LogTailer;

/// Default capacity of the line channel.
pub const DEFAULT_LINE_BUFFER: usize = 256;

/// Debounce window for file change notifications.
const NOTIFY_DEBOUNCE: Duration = Duration::from_millis(20);

/// Lines produced by a running [`LogSource`], in append order.
pub type LogLines = ReceiverStream<String>;

/// Source of new log lines for a single server launch.
///
/// Created when the server is started; it never replays lines written
/// before [`LogSource::attach`] returned.
#[derive(Debug)]
pub struct LogSource {
    tailer: LogTailer,
    poll_interval: Duration,
}

impl LogSource {
    /// Attach to the end of the log at `path`.
    pub async fn attach(path: PathBuf, poll_interval: Duration) -> Self {
        Self {
            tailer: LogTailer::attach(path).await,
            poll_interval,
        }
    }

    /// Set how long a vanished log may stay missing before the source ends.
    #[must_use]
    pub fn with_missing_grace(mut self, grace: Duration) -> Self {
        self.tailer = self.tailer.with_missing_grace(grace);
        self
    }

    /// Get the path being tailed.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.tailer.path()
    }

    /// Start tailing on a background task.
    ///
    /// The task checks `keep_running` before every read and finishes with
    /// `Ok(())` once it returns false or the line stream is dropped. A log
    /// that stays missing past its grace period, or is unreadable, ends the
    /// task with the error.
    pub fn spawn<F>(self, keep_running: F) -> (JoinHandle<Result<(), WatcherError>>, LogLines)
    where
        F: Fn() -> bool + Send + 'static,
    {
        let (line_tx, line_rx) = mpsc::channel(DEFAULT_LINE_BUFFER);
        let handle = tokio::spawn(self.run(keep_running, line_tx));
        (handle, ReceiverStream::new(line_rx))
    }

    async fn run<F>(
        mut self,
        keep_running: F,
        line_tx: mpsc::Sender<String>,
    ) -> Result<(), WatcherError>
    where
        F: Fn() -> bool + Send + 'static,
    {
        let (wake_tx, mut wake_rx) = mpsc::unbounded_channel::<()>();
        // Held so `recv` pends instead of closing when notify is unavailable
        let _wake_keepalive = wake_tx.clone();

        let watch_target = watch_target(self.path()).to_path_buf();
        let watched = new_debouncer(NOTIFY_DEBOUNCE, None, move |result: DebounceEventResult| {
            if result.is_ok() {
                let _ = wake_tx.send(());
            }
        })
        .and_then(|mut debouncer| {
            debouncer.watch(&watch_target, RecursiveMode::NonRecursive)?;
            Ok(debouncer)
        });
        let _debouncer = match watched {
            Ok(debouncer) => Some(debouncer),
            Err(e) => {
                tracing::warn!(
                    path = %self.path().display(),
                    error = %e,
                    "File notifications unavailable, polling only"
                );
                None
            }
        };

        tracing::debug!(path = %self.path().display(), "Log source attached");

        loop {
            if !keep_running() {
                tracing::debug!(path = %self.path().display(), "Log source finished");
                return Ok(());
            }

            for line in self.tailer.read_new_lines().await? {
                if line_tx.send(line).await.is_err() {
                    tracing::debug!("Line receiver dropped, stopping log source");
                    return Ok(());
                }
            }

            tokio::select! {
                _ = wake_rx.recv() => {}
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

/// Directory to watch for changes to `path`.
fn watch_target(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(path)
}
