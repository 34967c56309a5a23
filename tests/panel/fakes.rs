//! Recording collaborators for driving a panel in tests.

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use server_panel::config::PanelConfig;
use server_panel::controller::{ControllerError, ProcessController};
use server_panel::panel::{Indicator, IndicatorPanel, Panel, PanelHandle, StatusDisplay};
use server_panel::usage::{SamplerError, UsageSampler};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start,
    Stop,
    Broadcast(String),
}

#[derive(Default)]
pub struct RecordingController {
    calls: Mutex<Vec<Call>>,
}

impl RecordingController {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }
}

#[async_trait]
impl ProcessController for RecordingController {
    async fn start(&self) -> Result<(), ControllerError> {
        self.calls.lock().unwrap().push(Call::Start);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ControllerError> {
        self.calls.lock().unwrap().push(Call::Stop);
        Ok(())
    }

    async fn broadcast(&self, message: &str) -> Result<(), ControllerError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Broadcast(message.to_string()));
        Ok(())
    }
}

pub struct RecordingIndicators {
    lit: Mutex<Vec<Indicator>>,
    pulses: Mutex<Vec<(Indicator, u32)>>,
    finished: AtomicU32,
    pulse_duration: Duration,
}

impl RecordingIndicators {
    pub fn new(pulse_duration: Duration) -> Self {
        Self {
            lit: Mutex::new(Vec::new()),
            pulses: Mutex::new(Vec::new()),
            finished: AtomicU32::new(0),
            pulse_duration,
        }
    }

    pub fn is_lit(&self, indicator: Indicator) -> bool {
        self.lit.lock().unwrap().contains(&indicator)
    }

    pub fn any_lit(&self) -> bool {
        !self.lit.lock().unwrap().is_empty()
    }

    pub fn pulses(&self) -> Vec<(Indicator, u32)> {
        self.pulses.lock().unwrap().clone()
    }

    /// Pulse sequences that ran to completion.
    pub fn finished_pulses(&self) -> u32 {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndicatorPanel for RecordingIndicators {
    fn set(&self, indicator: Indicator, on: bool) {
        let mut lit = self.lit.lock().unwrap();
        lit.retain(|i| *i != indicator);
        if on {
            lit.push(indicator);
        }
    }

    async fn pulse(&self, indicator: Indicator, pulses: u32) {
        self.pulses.lock().unwrap().push((indicator, pulses));
        tokio::time::sleep(self.pulse_duration).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingDisplay {
    status: Mutex<String>,
    players: Mutex<Option<String>>,
}

impl RecordingDisplay {
    pub fn status(&self) -> String {
        self.status.lock().unwrap().clone()
    }

    pub fn players(&self) -> Option<String> {
        self.players.lock().unwrap().clone()
    }
}

impl StatusDisplay for RecordingDisplay {
    fn set_status_text(&self, text: &str) {
        *self.status.lock().unwrap() = text.to_string();
    }

    fn set_player_count_text(&self, text: &str) {
        *self.players.lock().unwrap() = Some(text.to_string());
    }

    fn clear_player_count_text(&self) {
        *self.players.lock().unwrap() = None;
    }
}

pub struct FixedSampler {
    cpu: u32,
    gpu: u32,
    samples: AtomicU32,
}

impl FixedSampler {
    pub fn new(cpu: u32, gpu: u32) -> Self {
        Self {
            cpu,
            gpu,
            samples: AtomicU32::new(0),
        }
    }

    pub fn samples(&self) -> u32 {
        self.samples.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UsageSampler for FixedSampler {
    async fn sample_cpu_percent(&self) -> Result<u32, SamplerError> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        Ok(self.cpu)
    }

    async fn sample_gpu_percent(&self) -> Result<u32, SamplerError> {
        Ok(self.gpu)
    }
}

/// A running panel with recording collaborators.
pub struct Harness {
    pub handle: PanelHandle,
    pub task: JoinHandle<()>,
    pub controller: Arc<RecordingController>,
    pub indicators: Arc<RecordingIndicators>,
    pub display: Arc<RecordingDisplay>,
    pub cancel: CancellationToken,
}

impl Harness {
    pub fn start(config: PanelConfig) -> Self {
        Self::start_with(config, None)
    }

    pub fn start_with(config: PanelConfig, sampler: Option<Arc<FixedSampler>>) -> Self {
        let controller = Arc::new(RecordingController::default());
        let indicators = Arc::new(RecordingIndicators::new(Duration::from_millis(200)));
        let display = Arc::new(RecordingDisplay::default());
        let cancel = CancellationToken::new();

        let mut panel = Panel::new(
            config,
            Arc::clone(&controller) as Arc<dyn ProcessController>,
            Arc::clone(&indicators) as Arc<dyn IndicatorPanel>,
            Arc::clone(&display) as Arc<dyn StatusDisplay>,
        )
        .with_cancellation(cancel.clone());
        if let Some(sampler) = sampler {
            panel = panel.with_sampler(sampler);
        }
        let (handle, task) = panel.start();

        Self {
            handle,
            task,
            controller,
            indicators,
            display,
            cancel,
        }
    }

    pub async fn shutdown(self) {
        self.cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), self.task)
            .await
            .expect("panel did not stop")
            .unwrap();
    }
}

/// Panel config tailing `log` with a fast poll.
pub fn config_for(log: &Path) -> PanelConfig {
    let mut config = PanelConfig::default();
    config.log.path = log.to_path_buf();
    config.log.poll_interval_ms = 10;
    config
}

/// Append one line to a log file.
pub fn append_line(path: &Path, line: &str) {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    writeln!(file, "{line}").unwrap();
}

/// Poll `condition` until it holds, failing after two seconds.
pub async fn eventually<F>(description: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {description}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Wait for a future with a two second limit.
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("timed out")
}
