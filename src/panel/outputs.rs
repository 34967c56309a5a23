//! Output surfaces driven by the panel.

use async_trait::async_trait;

use crate::config::DisplayConfig;

/// Physical indicator lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Lit while the server is running.
    Status,
    /// Pulses when the server reports it is overloaded.
    Overload,
    /// Lit while a shutdown is queued.
    QueuedShutdown,
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Status => "status",
            Self::Overload => "overload",
            Self::QueuedShutdown => "queued-shutdown",
        };
        f.write_str(name)
    }
}

/// Indicator light driver. Calls are fire-and-forget.
#[async_trait]
pub trait IndicatorPanel: Send + Sync {
    /// Switch an indicator fully on or off.
    fn set(&self, indicator: Indicator, on: bool);

    /// Pulse an indicator `pulses` times, returning once the sequence ends.
    async fn pulse(&self, indicator: Indicator, pulses: u32);
}

/// Two-line character display.
///
/// Text shorter than the display is written as given; padding is up to
/// the implementation.
pub trait StatusDisplay: Send + Sync {
    fn set_status_text(&self, text: &str);

    fn set_player_count_text(&self, text: &str);

    fn clear_player_count_text(&self);
}

/// Status line contents, one per lifecycle situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLine {
    Inactive,
    Starting,
    Running,
    Queued,
}

/// Configured text for each [`StatusLine`].
#[derive(Debug, Clone)]
pub struct StatusTexts {
    inactive: String,
    starting: String,
    running: String,
    queued: String,
}

impl StatusTexts {
    #[must_use]
    pub fn from_config(config: &DisplayConfig) -> Self {
        Self {
            inactive: config.inactive_text.clone(),
            starting: config.starting_text.clone(),
            running: config.running_text.clone(),
            queued: config.queued_text.clone(),
        }
    }

    #[must_use]
    pub fn text(&self, line: StatusLine) -> &str {
        match line {
            StatusLine::Inactive => &self.inactive,
            StatusLine::Starting => &self.starting,
            StatusLine::Running => &self.running,
            StatusLine::Queued => &self.queued,
        }
    }
}

impl Default for StatusTexts {
    fn default() -> Self {
        Self::from_config(&DisplayConfig::default())
    }
}

/// Player count line shown while the server is running.
#[must_use]
pub fn player_count_text(count: u32) -> String {
    format!("Player count: {count}")
}
