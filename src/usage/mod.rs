//! Resource usage sampling.

mod vcgencmd;

pub use vcgencmd::*;

use async_trait::async_trait;

/// Errors from a single usage sample.
#[derive(thiserror::Error, Debug)]
pub enum SamplerError {
    /// The query tool could not be run.
    #[error("Failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        source: std::io::Error,
    },
    /// The query tool exited unsuccessfully.
    #[error("{binary} exited with status {code:?}")]
    Failed { binary: String, code: Option<i32> },
    /// The query tool printed something unexpected.
    #[error("Unrecognized clock output: {0:?}")]
    Unparseable(String),
}

/// Samples CPU and GPU usage as whole percentages.
#[async_trait]
pub trait UsageSampler: Send + Sync {
    async fn sample_cpu_percent(&self) -> Result<u32, SamplerError>;

    async fn sample_gpu_percent(&self) -> Result<u32, SamplerError>;
}

/// Chat message announcing the sampled usage.
#[must_use]
pub fn usage_message(cpu: u32, gpu: u32) -> String {
    format!("CPU Usage: {cpu}%, GPU Usage: {gpu}%")
}
