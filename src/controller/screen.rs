//! Server control through a detached GNU screen session.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::process::Command;

use super::{ControllerError, ProcessController, ServerCommand};
use crate::config::ServerConfig;

/// Controls the server by launching it inside a named screen session and
/// typing console commands into that session.
#[derive(Debug)]
pub struct ScreenController {
    screen_binary: String,
    session_name: String,
    executable: PathBuf,
    last_command: Mutex<Option<ServerCommand>>,
}

impl ScreenController {
    /// Create a controller for the given session and server executable.
    #[must_use]
    pub fn new(session_name: impl Into<String>, executable: impl Into<PathBuf>) -> Self {
        Self {
            screen_binary: "screen".to_string(),
            session_name: session_name.into(),
            executable: executable.into(),
            last_command: Mutex::new(None),
        }
    }

    /// Create a controller from the `[server]` configuration.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.session_name.clone(), config.executable())
            .screen_binary(config.screen_binary.clone())
    }

    /// Use a different screen executable (for testing).
    #[must_use]
    pub fn screen_binary(mut self, binary: impl Into<String>) -> Self {
        self.screen_binary = binary.into();
        self
    }

    /// Get the session name.
    #[must_use]
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Most recent command issued, successful or not.
    #[must_use]
    pub fn last_command(&self) -> Option<ServerCommand> {
        self.last_command
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Build the screen arguments for a command.
    #[must_use]
    pub fn build_args(&self, command: &ServerCommand) -> Vec<String> {
        let mut args = vec!["-S".to_string(), self.session_name.clone()];

        match command.console_line() {
            None => {
                args.push("-dm".to_string());
                args.push(self.executable.display().to_string());
            }
            Some(line) => {
                args.push("-X".to_string());
                args.push("stuff".to_string());
                args.push(line);
            }
        }

        args
    }

    async fn execute(&self, command: ServerCommand) -> Result<(), ControllerError> {
        let args = self.build_args(&command);
        *self
            .last_command
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(command);

        tracing::debug!(binary = %self.screen_binary, ?args, "Running session command");

        let output = Command::new(&self.screen_binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ControllerError::from_io(&self.screen_binary, e))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ControllerError::CommandFailed {
                command: format!("{} {}", self.screen_binary, args[..args.len().min(3)].join(" ")),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl ProcessController for ScreenController {
    async fn start(&self) -> Result<(), ControllerError> {
        self.execute(ServerCommand::Start).await
    }

    async fn stop(&self) -> Result<(), ControllerError> {
        self.execute(ServerCommand::Stop).await
    }

    async fn broadcast(&self, message: &str) -> Result<(), ControllerError> {
        self.execute(ServerCommand::Broadcast(message.to_string())).await
    }
}
