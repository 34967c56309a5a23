//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the managed server is launched and addressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Directory containing the server binary.
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,
    /// Server executable name inside `install_dir`.
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Name of the screen session hosting the server console.
    #[serde(default = "default_session_name")]
    pub session_name: String,
    /// Screen executable.
    #[serde(default = "default_screen_binary")]
    pub screen_binary: String,
    /// Hold back `/stop` for a shutdown queued mid-start until the server
    /// reports it is running.
    #[serde(default)]
    pub defer_stop_until_running: bool,
}

fn default_install_dir() -> PathBuf {
    PathBuf::from("/home/server/vs_server")
}

fn default_binary() -> String {
    "VintagestoryServer".to_string()
}

fn default_session_name() -> String {
    "vs_server".to_string()
}

fn default_screen_binary() -> String {
    "screen".to_string()
}

impl ServerConfig {
    /// Full path of the server executable.
    #[must_use]
    pub fn executable(&self) -> PathBuf {
        self.install_dir.join(&self.binary)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            install_dir: default_install_dir(),
            binary: default_binary(),
            session_name: default_session_name(),
            screen_binary: default_screen_binary(),
            defer_stop_until_running: false,
        }
    }
}

/// Server log tailing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Main server log file.
    #[serde(default = "default_log_path")]
    pub path: PathBuf,
    /// Upper bound between two reads of the log file.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Seconds a vanished log may stay missing before its launch stops
    /// following it.
    #[serde(default = "default_missing_grace_secs")]
    pub missing_grace_secs: u64,
}

fn default_log_path() -> PathBuf {
    PathBuf::from("/home/server/.config/VintagestoryData/Logs/server-main.log")
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_missing_grace_secs() -> u64 {
    30
}

impl LogConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    #[must_use]
    pub fn missing_grace(&self) -> Duration {
        Duration::from_secs(self.missing_grace_secs)
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            poll_interval_ms: default_poll_interval_ms(),
            missing_grace_secs: default_missing_grace_secs(),
        }
    }
}

/// Usage announcement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// Announce usage in the server chat while it is running.
    pub enabled: bool,
    /// Seconds between two samples.
    pub interval_secs: u64,
    /// Announce once CPU or GPU usage reaches this percentage.
    pub threshold_percent: u32,
    /// ARM clock treated as 100% CPU usage.
    pub cpu_max_mhz: u32,
    /// Core clock treated as 100% GPU usage.
    pub gpu_max_mhz: u32,
    /// Clock query executable.
    pub vcgencmd_binary: String,
}

impl UsageConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            threshold_percent: 60,
            cpu_max_mhz: 1500,
            gpu_max_mhz: 500,
            vcgencmd_binary: "vcgencmd".to_string(),
        }
    }
}

/// Text shown on the status line and indicator timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub inactive_text: String,
    pub starting_text: String,
    pub running_text: String,
    pub queued_text: String,
    /// Pulses emitted by the overload indicator per overload line.
    pub overload_pulses: u32,
    /// Fade-in and fade-out time of one pulse.
    pub pulse_fade_ms: u64,
}

impl DisplayConfig {
    #[must_use]
    pub fn pulse_fade(&self) -> Duration {
        Duration::from_millis(self.pulse_fade_ms)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            inactive_text: "Server inactive ".to_string(),
            starting_text: "Server starting!".to_string(),
            running_text: "Server running  ".to_string(),
            queued_text: "Shutdown queued ".to_string(),
            overload_pulses: 2,
            pulse_fade_ms: 500,
        }
    }
}

/// Top-level panel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub usage: UsageConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}
