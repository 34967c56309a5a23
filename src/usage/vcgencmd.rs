//! Clock-based usage estimate via `vcgencmd` on a Raspberry Pi.
//!
//! Usage is approximated as the current clock relative to a configured
//! maximum, since the firmware scales clocks with load.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

use super::{SamplerError, UsageSampler};
use crate::config::UsageConfig;

/// Clock domains queried through `vcgencmd measure_clock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockDomain {
    /// ARM cores.
    Arm,
    /// VideoCore.
    Core,
}

impl ClockDomain {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arm => "arm",
            Self::Core => "core",
        }
    }
}

static CLOCK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"frequency\(\d+\)=(\d+)").expect("clock pattern is valid"));

/// Parse `measure_clock` output into hertz.
///
/// # Errors
///
/// Returns `SamplerError::Unparseable` if the output has no frequency.
pub fn parse_clock_hz(output: &str) -> Result<u64, SamplerError> {
    CLOCK_PATTERN
        .captures(output)
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| SamplerError::Unparseable(output.trim().to_string()))
}

/// Express a clock as a whole percentage of `max_mhz`.
#[must_use]
pub fn clock_percent(hz: u64, max_mhz: u32) -> u32 {
    if max_mhz == 0 {
        return 0;
    }
    let percent = hz / 10_000 / u64::from(max_mhz);
    u32::try_from(percent).unwrap_or(u32::MAX)
}

/// Usage sampler backed by the `vcgencmd` firmware tool.
#[derive(Debug, Clone)]
pub struct VcgencmdSampler {
    binary: String,
    cpu_max_mhz: u32,
    gpu_max_mhz: u32,
}

impl VcgencmdSampler {
    #[must_use]
    pub fn new(binary: impl Into<String>, cpu_max_mhz: u32, gpu_max_mhz: u32) -> Self {
        Self {
            binary: binary.into(),
            cpu_max_mhz,
            gpu_max_mhz,
        }
    }

    /// Create a sampler from the `[usage]` configuration.
    #[must_use]
    pub fn from_config(config: &UsageConfig) -> Self {
        Self::new(
            config.vcgencmd_binary.clone(),
            config.cpu_max_mhz,
            config.gpu_max_mhz,
        )
    }

    /// Read the current clock of a domain in hertz.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot run, fails, or prints garbage.
    pub async fn measure_clock(&self, domain: ClockDomain) -> Result<u64, SamplerError> {
        let output = Command::new(&self.binary)
            .args(["measure_clock", domain.as_str()])
            .output()
            .await
            .map_err(|source| SamplerError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SamplerError::Failed {
                binary: self.binary.clone(),
                code: output.status.code(),
            });
        }

        parse_clock_hz(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl UsageSampler for VcgencmdSampler {
    async fn sample_cpu_percent(&self) -> Result<u32, SamplerError> {
        let hz = self.measure_clock(ClockDomain::Arm).await?;
        Ok(clock_percent(hz, self.cpu_max_mhz))
    }

    async fn sample_gpu_percent(&self) -> Result<u32, SamplerError> {
        let hz = self.measure_clock(ClockDomain::Core).await?;
        Ok(clock_percent(hz, self.gpu_max_mhz))
    }
}
