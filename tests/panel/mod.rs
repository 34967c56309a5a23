//! Panel integration tests.

mod console_test;
mod fakes;
mod pipeline_test;

/// Verify the public panel types are exported from the library.
#[test]
fn test_all_panel_types_exported() {
    use server_panel::panel::{
        Action, BlinkTracker, Indicator, LifecycleMachine, LifecyclePhase, Notice, PanelError,
        SampleOutcome, SessionState, StatusLine, StatusTexts, Trigger,
    };

    let _ = LifecycleMachine::new();
    let _ = BlinkTracker::new();
    let _ = StatusTexts::default();
    let _ = SessionState::default();

    let _: fn() -> PanelError = || PanelError::Closed;
    let _ = Action::Blink(Indicator::Overload);
    let _ = Action::ShowStatus(StatusLine::Queued);
    let _ = Notice::ServerStopped;
    let _ = LifecyclePhase::ShutdownQueued;
    let _ = SampleOutcome::Skipped;
    let _ = Trigger::ButtonPress;
}
