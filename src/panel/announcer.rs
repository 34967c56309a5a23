//! Periodic usage announcements while the server is running.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::UsageConfig;
use crate::controller::ProcessController;
use crate::usage::{usage_message, UsageSampler};

/// Result of one sampling cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// A sample failed; nothing was announced.
    Skipped,
    /// Usage stayed below the threshold.
    Quiet { cpu: u32, gpu: u32 },
    /// Usage was announced to players.
    Announced { cpu: u32, gpu: u32 },
}

/// Samples CPU and GPU usage on an interval and announces high usage in
/// the server chat.
pub struct UsageAnnouncer {
    controller: Arc<dyn ProcessController>,
    sampler: Arc<dyn UsageSampler>,
    interval: Duration,
    threshold_percent: u32,
}

impl UsageAnnouncer {
    #[must_use]
    pub fn new(
        controller: Arc<dyn ProcessController>,
        sampler: Arc<dyn UsageSampler>,
        interval: Duration,
        threshold_percent: u32,
    ) -> Self {
        Self {
            controller,
            sampler,
            interval,
            threshold_percent,
        }
    }

    /// Create an announcer from the `[usage]` configuration.
    #[must_use]
    pub fn from_config(
        config: &UsageConfig,
        controller: Arc<dyn ProcessController>,
        sampler: Arc<dyn UsageSampler>,
    ) -> Self {
        Self::new(controller, sampler, config.interval(), config.threshold_percent)
    }

    /// Run on a background task.
    ///
    /// See [`UsageAnnouncer::run`].
    pub fn spawn<F>(self, keep_running: F, cancel: CancellationToken) -> JoinHandle<()>
    where
        F: Fn() -> bool + Send + 'static,
    {
        tokio::spawn(self.run(keep_running, cancel))
    }

    /// Sample and announce until `keep_running` returns false or `cancel`
    /// fires.
    ///
    /// Both are checked once per interval; the first sample is taken
    /// immediately.
    pub async fn run<F>(self, keep_running: F, cancel: CancellationToken)
    where
        F: Fn() -> bool + Send + 'static,
    {
        tracing::debug!(
            interval = ?self.interval,
            threshold = self.threshold_percent,
            "Usage announcer started"
        );

        loop {
            if cancel.is_cancelled() || !keep_running() {
                break;
            }

            let outcome = self.sample_once().await;
            tracing::trace!(?outcome, "Usage sample");

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::debug!("Usage announcer stopped");
    }

    /// Take one sample and announce it if either reading reaches the
    /// threshold.
    pub async fn sample_once(&self) -> SampleOutcome {
        let cpu = match self.sampler.sample_cpu_percent().await {
            Ok(cpu) => cpu,
            Err(e) => {
                tracing::warn!(error = %e, "CPU usage sample failed, skipping cycle");
                return SampleOutcome::Skipped;
            }
        };
        let gpu = match self.sampler.sample_gpu_percent().await {
            Ok(gpu) => gpu,
            Err(e) => {
                tracing::warn!(error = %e, "GPU usage sample failed, skipping cycle");
                return SampleOutcome::Skipped;
            }
        };

        if cpu < self.threshold_percent && gpu < self.threshold_percent {
            return SampleOutcome::Quiet { cpu, gpu };
        }

        let message = usage_message(cpu, gpu);
        tracing::info!(cpu, gpu, "Announcing high usage");
        if let Err(e) = self.controller.broadcast(&message).await {
            tracing::warn!(error = %e, "Failed to announce usage");
        }
        SampleOutcome::Announced { cpu, gpu }
    }
}
