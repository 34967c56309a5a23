//! Console input driving a panel.

use std::time::Duration;

use server_panel::console::drive_from_lines;
use server_panel::panel::LifecyclePhase;
use tokio::sync::mpsc;

use super::fakes::{config_for, eventually, within, Call, Harness};

#[tokio::test]
async fn console_lines_press_the_button() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::start(config_for(&dir.path().join("server-main.log")));
    let (line_tx, line_rx) = mpsc::channel(4);
    let cancel = harness.cancel.clone();
    let handle = harness.handle.clone();
    let driver = tokio::spawn(async move { drive_from_lines(&handle, line_rx, &cancel).await });

    line_tx.send("status".to_string()).await.unwrap();
    line_tx.send(String::new()).await.unwrap();
    within(
        harness
            .handle
            .wait_for(|s| s.phase == LifecyclePhase::Starting),
    )
    .await
    .unwrap();
    eventually("start command", || harness.controller.count(&Call::Start) == 1).await;

    harness.cancel.cancel();
    within(driver).await.unwrap();
    harness.shutdown().await;
}

#[tokio::test]
async fn closed_console_keeps_panel_running_until_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::start(config_for(&dir.path().join("server-main.log")));
    let (line_tx, line_rx) = mpsc::channel(4);
    let cancel = harness.cancel.clone();
    let handle = harness.handle.clone();
    let driver = tokio::spawn(async move { drive_from_lines(&handle, line_rx, &cancel).await });

    line_tx.send(String::new()).await.unwrap();
    drop(line_tx);
    eventually("start command", || harness.controller.count(&Call::Start) == 1).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!driver.is_finished());
    assert!(!harness.cancel.is_cancelled());
    assert!(!harness.task.is_finished());
    assert_eq!(harness.handle.state().phase, LifecyclePhase::Starting);

    harness.cancel.cancel();
    within(driver).await.unwrap();
    harness.shutdown().await;
}
