//! Server Panel - Game server supervisor for a physical control panel.

pub mod config;
pub mod console;
pub mod controller;
pub mod display;
pub mod events;
pub mod panel;
pub mod usage;
pub mod watcher;
