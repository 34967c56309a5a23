//! Panel runner.
//!
//! Owns the [`LifecycleMachine`] on a single task. Button presses and log
//! events arrive through one inbox, so every transition and its side
//! effects are applied in arrival order.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use super::{
    player_count_text, Action, BlinkTracker, Indicator, IndicatorPanel, LifecycleMachine, Notice,
    SessionState, StatusDisplay, StatusLine, StatusTexts, UsageAnnouncer,
};
use crate::config::PanelConfig;
use crate::controller::{ControllerError, ProcessController};
use crate::display;
use crate::events::{classify_all, highlight, ClassifiedEvent};
use crate::usage::UsageSampler;
use crate::watcher::{LogLines, LogSource, WatcherError};

/// Capacity of the panel inbox.
pub const DEFAULT_TRIGGER_BUFFER: usize = 64;

/// Error type for panel operations.
#[derive(thiserror::Error, Debug)]
pub enum PanelError {
    /// The panel task has exited.
    #[error("Panel is no longer running")]
    Closed,
}

/// Input to the panel task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// The start/stop button was pressed.
    ButtonPress,
    /// A classified line from the server log.
    Event(ClassifiedEvent),
}

/// Handle for driving a running panel and observing its state.
#[derive(Debug, Clone)]
pub struct PanelHandle {
    trigger_tx: mpsc::Sender<Trigger>,
    state_rx: watch::Receiver<SessionState>,
}

impl PanelHandle {
    /// Report a button press.
    ///
    /// # Errors
    ///
    /// Returns `PanelError::Closed` if the panel task has exited.
    pub async fn press_button(&self) -> Result<(), PanelError> {
        self.send(Trigger::ButtonPress).await
    }

    /// Feed an event as if it had been read from the log.
    ///
    /// # Errors
    ///
    /// Returns `PanelError::Closed` if the panel task has exited.
    pub async fn send_event(&self, event: ClassifiedEvent) -> Result<(), PanelError> {
        self.send(Trigger::Event(event)).await
    }

    async fn send(&self, trigger: Trigger) -> Result<(), PanelError> {
        self.trigger_tx
            .send(trigger)
            .await
            .map_err(|_| PanelError::Closed)
    }

    /// Latest published session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Wait until the published state satisfies `predicate`.
    ///
    /// # Errors
    ///
    /// Returns `PanelError::Closed` if the panel exits first.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<SessionState, PanelError>
    where
        F: FnMut(&SessionState) -> bool,
    {
        let mut rx = self.state_rx.clone();
        let state = rx
            .wait_for(|state| predicate(state))
            .await
            .map_err(|_| PanelError::Closed)?;
        Ok(*state)
    }
}

/// Control panel wiring: configuration plus the collaborators it drives.
pub struct Panel {
    config: PanelConfig,
    controller: Arc<dyn ProcessController>,
    indicators: Arc<dyn IndicatorPanel>,
    display: Arc<dyn StatusDisplay>,
    sampler: Option<Arc<dyn UsageSampler>>,
    cancel: CancellationToken,
}

impl Panel {
    #[must_use]
    pub fn new(
        config: PanelConfig,
        controller: Arc<dyn ProcessController>,
        indicators: Arc<dyn IndicatorPanel>,
        display: Arc<dyn StatusDisplay>,
    ) -> Self {
        Self {
            config,
            controller,
            indicators,
            display,
            sampler: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Announce high usage while the server runs.
    #[must_use]
    pub fn with_sampler(mut self, sampler: Arc<dyn UsageSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Stop the panel and every launch task when `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Spawn the panel task.
    ///
    /// The task runs until cancelled or until every [`PanelHandle`] is
    /// dropped and no launch is feeding it.
    #[must_use]
    pub fn start(self) -> (PanelHandle, JoinHandle<()>) {
        let (trigger_tx, trigger_rx) = mpsc::channel(DEFAULT_TRIGGER_BUFFER);
        let (state_tx, state_rx) = watch::channel(SessionState::default());

        let machine =
            LifecycleMachine::new().with_deferred_stop(self.config.server.defer_stop_until_running);
        let task = PanelTask {
            machine,
            texts: StatusTexts::from_config(&self.config.display),
            blinks: BlinkTracker::new(),
            launch: None,
            trigger_tx: trigger_tx.downgrade(),
            state_tx,
            config: self.config,
            controller: self.controller,
            indicators: self.indicators,
            display: self.display,
            sampler: self.sampler,
            cancel: self.cancel,
        };

        let handle = tokio::spawn(task.run(trigger_rx));
        (
            PanelHandle {
                trigger_tx,
                state_rx,
            },
            handle,
        )
    }
}

struct PanelTask {
    machine: LifecycleMachine,
    texts: StatusTexts,
    blinks: BlinkTracker,
    /// Scopes the log source and announcer of the current launch.
    launch: Option<CancellationToken>,
    trigger_tx: mpsc::WeakSender<Trigger>,
    state_tx: watch::Sender<SessionState>,
    config: PanelConfig,
    controller: Arc<dyn ProcessController>,
    indicators: Arc<dyn IndicatorPanel>,
    display: Arc<dyn StatusDisplay>,
    sampler: Option<Arc<dyn UsageSampler>>,
    cancel: CancellationToken,
}

impl PanelTask {
    async fn run(mut self, mut trigger_rx: mpsc::Receiver<Trigger>) {
        tracing::info!(log = %self.config.log.path.display(), "Panel ready");
        self.apply(Self::reset_outputs()).await;

        loop {
            let trigger = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    tracing::debug!("Panel cancelled");
                    break;
                }
                trigger = trigger_rx.recv() => match trigger {
                    Some(trigger) => trigger,
                    None => {
                        tracing::debug!("Panel inbox closed");
                        break;
                    }
                },
            };
            self.handle_trigger(trigger).await;
        }

        self.detach_launch();
    }

    fn reset_outputs() -> Vec<Action> {
        vec![
            Action::SetIndicator(Indicator::Status, false),
            Action::SetIndicator(Indicator::Overload, false),
            Action::SetIndicator(Indicator::QueuedShutdown, false),
            Action::ClearPlayerCount,
            Action::ShowStatus(StatusLine::Inactive),
        ]
    }

    async fn handle_trigger(&mut self, trigger: Trigger) {
        let actions = match &trigger {
            Trigger::ButtonPress => {
                tracing::debug!(state = %self.machine.state().effective_phase(), "Button pressed");
                self.machine.on_button_press()
            }
            Trigger::Event(event) => self.machine.on_event(event),
        };
        self.apply(actions).await;
    }

    /// Publish the machine's state, then execute `actions` in order.
    ///
    /// A failed controller command abandons the remaining actions in favour
    /// of the machine's rollback.
    async fn apply(&mut self, actions: Vec<Action>) {
        self.publish();

        let mut queue: VecDeque<Action> = actions.into();
        while let Some(action) = queue.pop_front() {
            if let Some(rollback) = self.process_action(action).await {
                self.publish();
                queue = rollback.into();
            }
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(*self.machine.state());
    }

    async fn process_action(&mut self, action: Action) -> Option<Vec<Action>> {
        match action {
            Action::StartServer => {
                if let Err(e) = self.controller.start().await {
                    report_failure("start", &e);
                    return Some(self.machine.start_failed());
                }
            }
            Action::StopServer => {
                if let Err(e) = self.controller.stop().await {
                    report_failure("stop", &e);
                    return Some(self.machine.stop_failed());
                }
            }
            Action::AttachLogSource => self.attach_log_source().await,
            Action::DetachLaunch => self.detach_launch(),
            Action::LaunchAnnouncer => self.launch_announcer(),
            Action::SetIndicator(indicator, on) => {
                self.indicators.set(indicator, on);
            }
            Action::Blink(indicator) => self.blink(indicator),
            Action::ShowStatus(line) => {
                self.display.set_status_text(self.texts.text(line));
            }
            Action::ShowPlayerCount(count) => {
                self.display.set_player_count_text(&player_count_text(count));
            }
            Action::ClearPlayerCount => self.display.clear_player_count_text(),
            Action::Notice(notice) => announce(notice),
        }
        None
    }

    /// Cancel the previous launch and start tailing the log for a new one.
    async fn attach_log_source(&mut self) {
        self.detach_launch();
        let launch = self.launch_token();

        let Some(trigger_tx) = self.trigger_tx.upgrade() else {
            tracing::debug!("Panel inbox closed, not attaching log source");
            return;
        };

        let source =
            LogSource::attach(self.config.log.path.clone(), self.config.log.poll_interval())
                .await
                .with_missing_grace(self.config.log.missing_grace());
        let running = launch.clone();
        let (source_handle, lines) = source.spawn(move || !running.is_cancelled());

        tokio::spawn(forward_lines(lines, source_handle, trigger_tx, launch));
    }

    fn launch_announcer(&mut self) {
        let Some(sampler) = self.sampler.clone() else {
            tracing::debug!("No usage sampler configured");
            return;
        };
        if !self.config.usage.enabled {
            tracing::debug!("Usage announcements disabled");
            return;
        }

        let launch = self.launch_token();
        let announcer =
            UsageAnnouncer::from_config(&self.config.usage, Arc::clone(&self.controller), sampler);
        let state_rx = self.state_tx.subscribe();
        announcer.spawn(move || state_rx.borrow().is_operational(), launch);
    }

    /// Pulse `indicator` unless it is already pulsing.
    ///
    /// The pulse belongs to the current launch and is cut short when the
    /// launch is detached.
    fn blink(&mut self, indicator: Indicator) {
        let Some(guard) = self.blinks.try_begin(indicator) else {
            tracing::debug!(%indicator, "Indicator already pulsing, dropping blink");
            return;
        };

        let launch = self.launch_token();
        let indicators = Arc::clone(&self.indicators);
        let pulses = self.config.display.overload_pulses;
        tokio::spawn(async move {
            tokio::select! {
                () = launch.cancelled() => {
                    tracing::debug!(%indicator, "Launch detached, cutting pulse short");
                    indicators.set(indicator, false);
                }
                () = indicators.pulse(indicator, pulses) => {}
            }
            drop(guard);
        });
    }

    /// Token of the current launch, creating one if none is active.
    fn launch_token(&mut self) -> CancellationToken {
        self.launch
            .get_or_insert_with(|| self.cancel.child_token())
            .clone()
    }

    fn detach_launch(&mut self) {
        if let Some(launch) = self.launch.take() {
            tracing::debug!("Detaching launch tasks");
            launch.cancel();
        }
    }
}

fn report_failure(command: &str, error: &ControllerError) {
    tracing::error!(command, error = %error, "Server command failed");
    display::print_error(&format!("Failed to {command} server: {error}"));
}

fn announce(notice: Notice) {
    tracing::debug!(?notice, "Notice");
    display::print_notice(notice.message());
}

/// Echo, classify and forward lines of one launch until it ends.
async fn forward_lines(
    mut lines: LogLines,
    source: JoinHandle<Result<(), WatcherError>>,
    trigger_tx: mpsc::Sender<Trigger>,
    launch: CancellationToken,
) {
    'lines: while let Some(line) = lines.next().await {
        if let Some(kind) = highlight(&line) {
            display::print_log_line(&line, kind);
        }

        for event in classify_all(&line) {
            if !event.is_lifecycle() {
                tracing::trace!(%line, "Unclassified log line");
                continue;
            }
            if launch.is_cancelled() {
                break 'lines;
            }
            if trigger_tx.send(Trigger::Event(event)).await.is_err() {
                break 'lines;
            }
        }
    }
    drop(lines);

    match source.await {
        Ok(Ok(())) => tracing::debug!("Log forwarding finished"),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Log source failed");
            display::print_warning(&format!("Stopped reading server log: {e}"));
        }
        Err(e) => tracing::warn!(error = %e, "Log source task panicked"),
    }
}
