//! Session state machine.
//!
//! [`LifecycleMachine`] is pure: each trigger mutates the session state
//! and returns the side effects to perform, in order. The panel runner owns
//! the only instance and executes those effects.

use serde::{Deserialize, Serialize};

use super::{Indicator, StatusLine};
use crate::events::ClassifiedEvent;

/// Lifecycle phase of the managed server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// No server process running.
    #[default]
    Inactive,
    /// Start issued, readiness not yet logged.
    Starting,
    /// Server accepts players.
    Operational,
    /// Stop issued, waiting for the server to confirm shutdown.
    ShutdownQueued,
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Inactive => "inactive",
            Self::Starting => "starting",
            Self::Operational => "operational",
            Self::ShutdownQueued => "shutdown_queued",
        };
        f.write_str(s)
    }
}

/// Authoritative state of the current server session.
///
/// `phase` only ever holds `Inactive`, `Starting` or `Operational`; a
/// queued shutdown is the `shutdown_queued` flag layered on top of the
/// phase it was requested in. [`SessionState::effective_phase`] folds the
/// two together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: LifecyclePhase,
    pub shutdown_queued: bool,
    pub player_count: u32,
}

impl SessionState {
    /// Phase including a queued shutdown.
    #[must_use]
    pub fn effective_phase(&self) -> LifecyclePhase {
        if self.shutdown_queued {
            LifecyclePhase::ShutdownQueued
        } else {
            self.phase
        }
    }

    #[must_use]
    pub fn is_operational(&self) -> bool {
        self.phase == LifecyclePhase::Operational
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Operator-facing console messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    StartingServer,
    ShuttingDown,
    ShutdownQueued,
    ShutdownAlreadyQueued,
    ServerStopped,
}

impl Notice {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::StartingServer => "Starting server... this takes about 2 minutes",
            Self::ShuttingDown => "Shutting down server...",
            Self::ShutdownQueued => "Queued server shutdown",
            Self::ShutdownAlreadyQueued => "Shutdown already queued.",
            Self::ServerStopped => "Server successfully shut down",
        }
    }
}

/// A side effect requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    StartServer,
    StopServer,
    /// Begin tailing the log for a new launch.
    AttachLogSource,
    /// End every task tied to the current launch.
    DetachLaunch,
    LaunchAnnouncer,
    SetIndicator(Indicator, bool),
    Blink(Indicator),
    ShowStatus(StatusLine),
    ShowPlayerCount(u32),
    ClearPlayerCount,
    Notice(Notice),
}

/// Transition rules for button presses and log events.
#[derive(Debug, Clone, Default)]
pub struct LifecycleMachine {
    state: SessionState,
    defer_stop_until_running: bool,
    /// A shutdown was queued mid-start and `/stop` is still owed.
    stop_deferred: bool,
}

impl LifecycleMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold back the stop command for a shutdown queued while starting
    /// until the server reports it is running.
    #[must_use]
    pub fn with_deferred_stop(mut self, defer: bool) -> Self {
        self.defer_stop_until_running = defer;
        self
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Handle a press of the start/stop button.
    pub fn on_button_press(&mut self) -> Vec<Action> {
        if self.state.shutdown_queued {
            tracing::info!("Button pressed with shutdown already queued");
            return vec![Action::Notice(Notice::ShutdownAlreadyQueued)];
        }

        match self.state.phase {
            LifecyclePhase::Inactive => {
                self.transition(LifecyclePhase::Starting);
                vec![
                    Action::AttachLogSource,
                    Action::StartServer,
                    Action::ShowStatus(StatusLine::Starting),
                    Action::Notice(Notice::StartingServer),
                ]
            }
            LifecyclePhase::Operational => {
                self.state.shutdown_queued = true;
                vec![
                    Action::SetIndicator(Indicator::QueuedShutdown, true),
                    Action::ShowStatus(StatusLine::Queued),
                    Action::Notice(Notice::ShuttingDown),
                    Action::StopServer,
                ]
            }
            LifecyclePhase::Starting | LifecyclePhase::ShutdownQueued => {
                self.state.shutdown_queued = true;
                let mut actions = vec![
                    Action::SetIndicator(Indicator::QueuedShutdown, true),
                    Action::ShowStatus(StatusLine::Queued),
                    Action::Notice(Notice::ShutdownQueued),
                ];
                if self.defer_stop_until_running {
                    tracing::debug!("Deferring stop until the server is running");
                    self.stop_deferred = true;
                } else {
                    actions.push(Action::StopServer);
                }
                actions
            }
        }
    }

    /// Handle one classified log event.
    pub fn on_event(&mut self, event: &ClassifiedEvent) -> Vec<Action> {
        match event {
            ClassifiedEvent::Started => self.on_started(),
            ClassifiedEvent::Overloaded => vec![Action::Blink(Indicator::Overload)],
            ClassifiedEvent::Stopped => self.on_stopped(),
            ClassifiedEvent::PlayerJoined => self.on_player_change(true),
            ClassifiedEvent::PlayerLeft => self.on_player_change(false),
            ClassifiedEvent::Ignored(line) => {
                tracing::trace!(%line, "Ignoring log line");
                Vec::new()
            }
        }
    }

    /// Roll back a press whose start command failed.
    pub fn start_failed(&mut self) -> Vec<Action> {
        self.reset();
        vec![Action::DetachLaunch, Action::ShowStatus(StatusLine::Inactive)]
    }

    /// Roll back a queued shutdown whose stop command failed.
    pub fn stop_failed(&mut self) -> Vec<Action> {
        self.state.shutdown_queued = false;
        self.stop_deferred = false;
        let line = match self.state.phase {
            LifecyclePhase::Operational => StatusLine::Running,
            LifecyclePhase::Starting => StatusLine::Starting,
            LifecyclePhase::Inactive | LifecyclePhase::ShutdownQueued => StatusLine::Inactive,
        };
        vec![
            Action::SetIndicator(Indicator::QueuedShutdown, false),
            Action::ShowStatus(line),
        ]
    }

    fn on_started(&mut self) -> Vec<Action> {
        if self.state.phase != LifecyclePhase::Starting {
            tracing::debug!(phase = %self.state.phase, "Ignoring start event outside of startup");
            return Vec::new();
        }

        self.transition(LifecyclePhase::Operational);
        self.state.player_count = 0;

        let line = if self.state.shutdown_queued {
            StatusLine::Queued
        } else {
            StatusLine::Running
        };
        let mut actions = vec![
            Action::SetIndicator(Indicator::Status, true),
            Action::ShowStatus(line),
            Action::ShowPlayerCount(0),
            Action::LaunchAnnouncer,
        ];
        if std::mem::take(&mut self.stop_deferred) {
            actions.push(Action::StopServer);
        }
        actions
    }

    fn on_stopped(&mut self) -> Vec<Action> {
        self.reset();
        vec![
            Action::DetachLaunch,
            Action::SetIndicator(Indicator::Status, false),
            Action::SetIndicator(Indicator::Overload, false),
            Action::SetIndicator(Indicator::QueuedShutdown, false),
            Action::ClearPlayerCount,
            Action::ShowStatus(StatusLine::Inactive),
            Action::Notice(Notice::ServerStopped),
        ]
    }

    fn on_player_change(&mut self, joined: bool) -> Vec<Action> {
        if !self.state.is_operational() {
            tracing::debug!(
                phase = %self.state.phase,
                joined,
                "Ignoring player event outside of operation"
            );
            return Vec::new();
        }

        if joined {
            self.state.player_count = self.state.player_count.saturating_add(1);
        } else if self.state.player_count == 0 {
            tracing::warn!("Player left with no players counted, keeping count at 0");
        } else {
            self.state.player_count -= 1;
        }

        vec![Action::ShowPlayerCount(self.state.player_count)]
    }

    fn transition(&mut self, phase: LifecyclePhase) {
        tracing::debug!(from = %self.state.phase, to = %phase, "State transition");
        self.state.phase = phase;
    }

    fn reset(&mut self) {
        if self.state.phase != LifecyclePhase::Inactive {
            tracing::debug!(
                from = %self.state.phase,
                to = %LifecyclePhase::Inactive,
                "State transition"
            );
        }
        self.state.reset();
        self.stop_deferred = false;
    }
}
