//! End-to-end tests: log file lines drive the panel.

use std::sync::Arc;
use std::time::Duration;

use server_panel::panel::{Indicator, LifecyclePhase, SessionState};

use super::fakes::{append_line, config_for, eventually, within, Call, FixedSampler, Harness};

const STARTED: &str =
    "18.3.2025 19:02:11 [Notification] Dedicated Server now running on Port 42420 and all ips!";
const STOPPED: &str = "18.3.2025 21:40:03 [Event] Stopped the server!";
const OVERLOADED: &str =
    "18.3.2025 20:11:57 [Warning] Server overloaded. A tick took 731ms to complete.";

fn joined(name: &str) -> String {
    format!("18.3.2025 19:05:40 [Event] {name} [::ffff:10.0.0.12]:51234 joins.")
}

fn left(name: &str) -> String {
    format!("18.3.2025 20:45:01 [Event] Player {name} left.")
}

#[tokio::test]
async fn log_lines_drive_full_session() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("server-main.log");
    std::fs::write(&log, "").unwrap();
    let harness = Harness::start(config_for(&log));

    harness.handle.press_button().await.unwrap();
    eventually("start command", || harness.controller.count(&Call::Start) == 1).await;

    append_line(&log, "18.3.2025 19:01:02 [Notification] Starting world generators");
    append_line(&log, STARTED);
    within(harness.handle.wait_for(SessionState::is_operational))
        .await
        .unwrap();

    append_line(&log, &joined("anna"));
    append_line(&log, &joined("ben"));
    append_line(&log, &joined("cleo"));
    append_line(&log, &left("ben"));
    let state = within(harness.handle.wait_for(|s| s.player_count == 2))
        .await
        .unwrap();
    assert_eq!(state.phase, LifecyclePhase::Operational);
    eventually("player count text", || {
        harness.display.players().as_deref() == Some("Player count: 2")
    })
    .await;

    harness.handle.press_button().await.unwrap();
    eventually("stop command", || harness.controller.count(&Call::Stop) == 1).await;

    append_line(&log, STOPPED);
    within(
        harness
            .handle
            .wait_for(|s| s.phase == LifecyclePhase::Inactive),
    )
    .await
    .unwrap();
    eventually("inactive text", || harness.display.status() == "Server inactive ").await;
    assert!(!harness.indicators.any_lit());

    harness.shutdown().await;
}

#[tokio::test]
async fn lines_written_before_launch_are_not_replayed() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("server-main.log");
    std::fs::write(&log, format!("{STARTED}\n{}\n", joined("old"))).unwrap();
    let harness = Harness::start(config_for(&log));

    harness.handle.press_button().await.unwrap();
    eventually("start command", || harness.controller.count(&Call::Start) == 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(harness.handle.state().phase, LifecyclePhase::Starting);
    harness.shutdown().await;
}

#[tokio::test]
async fn log_created_after_launch_is_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("server-main.log");
    let harness = Harness::start(config_for(&log));

    harness.handle.press_button().await.unwrap();
    eventually("start command", || harness.controller.count(&Call::Start) == 1).await;

    append_line(&log, STARTED);
    within(harness.handle.wait_for(SessionState::is_operational))
        .await
        .unwrap();
    harness.shutdown().await;
}

#[tokio::test]
async fn overloaded_lines_pulse_indicator() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("server-main.log");
    std::fs::write(&log, "").unwrap();
    let harness = Harness::start(config_for(&log));

    harness.handle.press_button().await.unwrap();
    eventually("start command", || harness.controller.count(&Call::Start) == 1).await;
    append_line(&log, STARTED);
    append_line(&log, OVERLOADED);
    append_line(&log, OVERLOADED);

    eventually("overload pulse", || !harness.indicators.pulses().is_empty()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.indicators.pulses(), vec![(Indicator::Overload, 2)]);

    harness.shutdown().await;
}

#[tokio::test]
async fn usage_is_announced_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("server-main.log");
    std::fs::write(&log, "").unwrap();
    let sampler = Arc::new(FixedSampler::new(90, 10));
    let harness = Harness::start_with(config_for(&log), Some(Arc::clone(&sampler)));

    harness.handle.press_button().await.unwrap();
    eventually("start command", || harness.controller.count(&Call::Start) == 1).await;
    assert_eq!(sampler.samples(), 0);

    append_line(&log, STARTED);
    eventually("usage broadcast", || {
        harness
            .controller
            .count(&Call::Broadcast("CPU Usage: 90%, GPU Usage: 10%".to_string()))
            == 1
    })
    .await;

    harness.shutdown().await;
}

#[tokio::test]
async fn low_usage_is_not_announced() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("server-main.log");
    std::fs::write(&log, "").unwrap();
    let sampler = Arc::new(FixedSampler::new(20, 30));
    let harness = Harness::start_with(config_for(&log), Some(Arc::clone(&sampler)));

    harness.handle.press_button().await.unwrap();
    eventually("start command", || harness.controller.count(&Call::Start) == 1).await;
    append_line(&log, STARTED);
    eventually("usage sample", || sampler.samples() == 1).await;

    assert!(!harness
        .controller
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Broadcast(_))));
    harness.shutdown().await;
}

#[tokio::test]
async fn recreated_log_is_followed() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("server-main.log");
    std::fs::write(&log, "previous run\n").unwrap();
    let harness = Harness::start(config_for(&log));

    harness.handle.press_button().await.unwrap();
    eventually("start command", || harness.controller.count(&Call::Start) == 1).await;

    // The server rotates its log on start
    std::fs::remove_file(&log).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    append_line(&log, STARTED);
    within(harness.handle.wait_for(SessionState::is_operational))
        .await
        .unwrap();

    harness.handle.press_button().await.unwrap();
    eventually("stop command", || harness.controller.count(&Call::Stop) == 1).await;
    append_line(&log, STOPPED);
    within(
        harness
            .handle
            .wait_for(|s| s.phase == LifecyclePhase::Inactive),
    )
    .await
    .unwrap();

    harness.shutdown().await;
}

#[tokio::test]
async fn previous_launch_stops_reading_after_stop() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("server-main.log");
    std::fs::write(&log, "").unwrap();
    let harness = Harness::start(config_for(&log));

    harness.handle.press_button().await.unwrap();
    eventually("first start", || harness.controller.count(&Call::Start) == 1).await;
    append_line(&log, STARTED);
    within(harness.handle.wait_for(SessionState::is_operational))
        .await
        .unwrap();
    append_line(&log, STOPPED);
    within(
        harness
            .handle
            .wait_for(|s| s.phase == LifecyclePhase::Inactive),
    )
    .await
    .unwrap();

    harness.handle.press_button().await.unwrap();
    eventually("second start", || harness.controller.count(&Call::Start) == 2).await;
    append_line(&log, STARTED);
    append_line(&log, &joined("anna"));
    within(harness.handle.wait_for(|s| s.player_count == 1))
        .await
        .unwrap();

    // Only the second launch forwards these lines
    tokio::time::sleep(Duration::from_millis(100)).await;
    let state = harness.handle.state();
    assert_eq!(state.phase, LifecyclePhase::Operational);
    assert_eq!(state.player_count, 1);

    harness.shutdown().await;
}

#[tokio::test]
async fn announcer_stops_sampling_after_stop() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("server-main.log");
    std::fs::write(&log, "").unwrap();
    let mut config = config_for(&log);
    config.usage.interval_secs = 1;
    let sampler = Arc::new(FixedSampler::new(20, 30));
    let harness = Harness::start_with(config, Some(Arc::clone(&sampler)));

    harness.handle.press_button().await.unwrap();
    eventually("start command", || harness.controller.count(&Call::Start) == 1).await;
    append_line(&log, STARTED);
    eventually("first sample", || sampler.samples() == 1).await;

    append_line(&log, STOPPED);
    within(
        harness
            .handle
            .wait_for(|s| s.phase == LifecyclePhase::Inactive),
    )
    .await
    .unwrap();
    let samples_at_stop = sampler.samples();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(sampler.samples(), samples_at_stop);
    assert!(samples_at_stop <= 2);

    harness.shutdown().await;
}
