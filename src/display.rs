//! Colored console output for the panel.
//!
//! Echoed server log lines, operator notices and the console stand-ins for
//! the indicator lights and character display all print through here.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::events::{ClassifiedEvent, LineHighlight};

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Maximum length for echoed log lines.
const DEFAULT_MAX_LEN: usize = 160;

/// Truncate a string to at most `max_len` characters, adding an ellipsis
/// if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

/// Echo a server log line, colored by category.
pub fn print_log_line(line: &str, kind: LineHighlight) {
    let line = truncate(line, DEFAULT_MAX_LEN);
    match kind {
        LineHighlight::Plain => println!("{line}"),
        LineHighlight::Loading => println!("{}", line.blue()),
        LineHighlight::Pause => println!("{}", line.yellow()),
        LineHighlight::Player => println!("{}", line.magenta()),
        LineHighlight::Overload => println!("{}", line.red()),
    }
    let _ = io::stdout().flush();
}

/// Print an operator notice.
pub fn print_notice(message: &str) {
    println!(
        "{} {} {}",
        timestamp().dimmed(),
        "[PANEL]".cyan().bold(),
        message
    );
    let _ = io::stdout().flush();
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!(
        "{} {} {}",
        timestamp().dimmed(),
        "[WARN]".yellow().bold(),
        message
    );
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    println!("{} {}", "[ERROR]".red().bold(), message);
    let _ = io::stdout().flush();
}

/// Print an indicator change.
pub fn print_indicator(name: &str, on: bool) {
    let state = if on {
        "on".green().bold().to_string()
    } else {
        "off".dimmed().to_string()
    };
    println!("{} {} {name} {state}", timestamp().dimmed(), "[LED]".blue().bold());
    let _ = io::stdout().flush();
}

/// Print one step of an indicator pulse sequence.
pub fn print_pulse(name: &str, pulse: u32, pulses: u32) {
    println!(
        "{} {} {name} pulse {pulse}/{pulses}",
        timestamp().dimmed(),
        "[LED]".red().bold()
    );
    let _ = io::stdout().flush();
}

/// Print the contents of the character display.
pub fn print_display(status: &str, players: &str) {
    println!(
        "{} {} [{}] [{}]",
        timestamp().dimmed(),
        "[LCD]".green().bold(),
        status,
        players
    );
    let _ = io::stdout().flush();
}

/// Format the classification of a log line for the `classify` command.
#[must_use]
pub fn format_classification(number: usize, line: &str, events: &[ClassifiedEvent]) -> String {
    let names: Vec<&str> = events
        .iter()
        .map(|event| match event {
            ClassifiedEvent::Started => "started",
            ClassifiedEvent::Overloaded => "overloaded",
            ClassifiedEvent::Stopped => "stopped",
            ClassifiedEvent::PlayerJoined => "player_joined",
            ClassifiedEvent::PlayerLeft => "player_left",
            ClassifiedEvent::Ignored(_) => "ignored",
        })
        .collect();
    format!("{number:>6} {:<28} {}", names.join(","), truncate(line, DEFAULT_MAX_LEN))
}

/// Print the classification of a log line.
pub fn print_classification(number: usize, line: &str, events: &[ClassifiedEvent]) {
    let formatted = format_classification(number, line, events);
    if events.iter().any(ClassifiedEvent::is_lifecycle) {
        println!("{}", formatted.bold());
    } else {
        println!("{}", formatted.dimmed());
    }
    let _ = io::stdout().flush();
}
