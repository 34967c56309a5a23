//! Configuration file loader.

use std::path::{Path, PathBuf};

use super::PanelConfig;

/// Configuration loader that searches multiple locations.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Search paths in order of priority.
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default search paths.
    #[must_use]
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        // 1. Current directory: .server-panel.toml
        search_paths.push(PathBuf::from(".server-panel.toml"));

        // 2. User config directory: ~/.config/server-panel/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("server-panel").join("config.toml"));
        }

        Self { search_paths }
    }

    /// Create a config loader with a specific config file path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
        }
    }

    /// Load configuration from the first available file, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load(&self) -> Result<PanelConfig, ConfigError> {
        let Some(path) = self.find_config_file() else {
            tracing::debug!("No config file found, using defaults");
            return Ok(PanelConfig::default());
        };

        tracing::debug!(path = %path.display(), "Loading config file");
        Self::load_from_path(path)
    }

    fn load_from_path(path: &Path) -> Result<PanelConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Find the first config file that exists.
    fn find_config_file(&self) -> Option<&Path> {
        self.search_paths
            .iter()
            .find(|p| p.exists())
            .map(PathBuf::as_path)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}
