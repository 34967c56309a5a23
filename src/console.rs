//! Console stand-ins for the panel hardware.
//!
//! Used by the `run` command when the lights and character display are
//! driven elsewhere; every change is printed instead. Button presses come
//! from console lines.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::DisplayConfig;
use crate::display;
use crate::panel::{Indicator, IndicatorPanel, PanelHandle, StatusDisplay};

/// Console line that prints the session state instead of pressing.
pub const STATUS_COMMAND: &str = "status";

/// Drive `handle` from console lines until `cancel` fires.
///
/// Each line is a button press, except [`STATUS_COMMAND`] which prints the
/// state as JSON. Once `lines` closes the panel keeps running until
/// `cancel` fires. Returns early if the panel exits.
pub async fn drive_from_lines(
    handle: &PanelHandle,
    mut lines: mpsc::Receiver<String>,
    cancel: &CancellationToken,
) {
    loop {
        let line = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            tracing::info!("Console input closed, panel keeps running until interrupted");
            cancel.cancelled().await;
            return;
        };

        if line.trim() == STATUS_COMMAND {
            match serde_json::to_string(&handle.state()) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize state"),
            }
        } else if handle.press_button().await.is_err() {
            tracing::debug!("Panel closed, no longer reading console input");
            return;
        }
    }
}

/// Indicator lights printed to the console.
#[derive(Debug, Clone)]
pub struct ConsoleIndicators {
    fade: Duration,
}

impl ConsoleIndicators {
    #[must_use]
    pub fn new(fade: Duration) -> Self {
        Self { fade }
    }

    #[must_use]
    pub fn from_config(config: &DisplayConfig) -> Self {
        Self::new(config.pulse_fade())
    }
}

#[async_trait]
impl IndicatorPanel for ConsoleIndicators {
    fn set(&self, indicator: Indicator, on: bool) {
        display::print_indicator(&indicator.to_string(), on);
    }

    async fn pulse(&self, indicator: Indicator, pulses: u32) {
        let name = indicator.to_string();
        for pulse in 1..=pulses {
            display::print_pulse(&name, pulse, pulses);
            // Fade in then out
            tokio::time::sleep(self.fade * 2).await;
        }
    }
}

#[derive(Debug, Default)]
struct Lines {
    status: String,
    players: String,
}

/// Two-line character display printed to the console on every change.
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    lines: Mutex<Lines>,
}

impl ConsoleDisplay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents as `(status, players)`.
    #[must_use]
    pub fn contents(&self) -> (String, String) {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        (lines.status.clone(), lines.players.clone())
    }

    fn update(&self, apply: impl FnOnce(&mut Lines)) {
        let (status, players) = {
            let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
            apply(&mut lines);
            (lines.status.clone(), lines.players.clone())
        };
        display::print_display(&status, &players);
    }
}

impl StatusDisplay for ConsoleDisplay {
    fn set_status_text(&self, text: &str) {
        self.update(|lines| lines.status = text.to_string());
    }

    fn set_player_count_text(&self, text: &str) {
        self.update(|lines| lines.players = text.to_string());
    }

    fn clear_player_count_text(&self) {
        self.update(|lines| lines.players.clear());
    }
}
