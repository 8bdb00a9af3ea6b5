//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/codroid/config.toml` by default:
//!
//! ```toml
//! debug = false
//!
//! [connection]
//! host = "192.168.1.136"
//! port = 9001
//! connect_timeout_ms = 5000
//! exchange_timeout_ms = 5000
//! max_read_size = 1024
//! ```
//!
//! Command-line flags and `CODROID_*` environment variables override the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::connection::ConnectionSettings;
use crate::error::{ClientError, ClientResult};

/// Configuration for the codroid client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode: verbose logging and raw message tracing.
    pub debug: bool,

    /// Controller connection settings.
    pub connection: ConnectionSettings,
}

impl ClientConfig {
    /// Loads configuration from the default path.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> ClientResult<Self> {
        toml::from_str(content).map_err(|e| ClientError::Config(format!("failed to parse config: {e}")))
    }

    /// Returns the connection settings with the top-level debug flag applied.
    pub fn connection_settings(&self) -> ConnectionSettings {
        let mut settings = self.connection.clone();
        settings.debug |= self.debug;
        settings
    }

    /// Checks every section.
    pub fn validate(&self) -> ClientResult<()> {
        self.connection.validate()
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("codroid")
    }
}
