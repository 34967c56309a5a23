//! Classification of server log lines into lifecycle events.
//!
//! Matching is substring based. Each marker is checked on its own, so one
//! line can produce several events; join and leave are the exception and
//! never both fire for the same line.

/// Logged once the dedicated server accepts players.
pub const STARTED_MARKER: &str = "Dedicated Server now running";
/// Logged when the server tick falls behind.
pub const OVERLOADED_MARKER: &str = "overloaded";
/// Logged as the last line of a clean shutdown.
pub const STOPPED_MARKER: &str = "Stopped the server!";
pub const JOINED_MARKER: &str = "joins.";
pub const LEFT_MARKER: &str = "left.";

const LOADING_MARKERS: [&str; 2] = ["Loaded", "Starting world"];
const PAUSE_MARKERS: [&str; 2] = ["pausing game", "resuming game"];

/// Semantic signal derived from a single log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedEvent {
    Started,
    Overloaded,
    Stopped,
    PlayerJoined,
    PlayerLeft,
    /// A line with no lifecycle meaning, kept for diagnostics.
    Ignored(String),
}

impl ClassifiedEvent {
    /// Returns true if this event can change the session state.
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        !matches!(self, Self::Ignored(_))
    }
}

/// Classify a trimmed log line, returning every event it carries.
///
/// Events come back in a fixed order: started, overloaded, stopped, then
/// the player event. A line matching nothing yields a single `Ignored`.
#[must_use]
pub fn classify_all(line: &str) -> Vec<ClassifiedEvent> {
    let mut events = Vec::new();

    if line.contains(STARTED_MARKER) {
        events.push(ClassifiedEvent::Started);
    }
    if line.contains(OVERLOADED_MARKER) {
        events.push(ClassifiedEvent::Overloaded);
    }
    if line.contains(STOPPED_MARKER) {
        events.push(ClassifiedEvent::Stopped);
    }
    if line.contains(JOINED_MARKER) {
        events.push(ClassifiedEvent::PlayerJoined);
    } else if line.contains(LEFT_MARKER) {
        events.push(ClassifiedEvent::PlayerLeft);
    }

    if events.is_empty() {
        events.push(ClassifiedEvent::Ignored(line.to_string()));
    }
    events
}

/// Console category of a log line worth echoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineHighlight {
    /// Server readiness line, echoed as is.
    Plain,
    Loading,
    Pause,
    Player,
    Overload,
}

/// Pick how a log line is echoed to the console, or `None` to keep it quiet.
#[must_use]
pub fn highlight(line: &str) -> Option<LineHighlight> {
    if line.contains(OVERLOADED_MARKER) {
        Some(LineHighlight::Overload)
    } else if line.contains(JOINED_MARKER) || line.contains(LEFT_MARKER) {
        Some(LineHighlight::Player)
    } else if PAUSE_MARKERS.iter().any(|m| line.contains(m)) {
        Some(LineHighlight::Pause)
    } else if LOADING_MARKERS.iter().any(|m| line.contains(m)) {
        Some(LineHighlight::Loading)
    } else if line.contains(STARTED_MARKER) {
        Some(LineHighlight::Plain)
    } else {
        None
    }
}
