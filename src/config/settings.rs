//! Application settings

use crate::core::gpio::Backend;
use crate::core::logging::LoggingConfig;
use crate::core::power::{DEFAULT_MARKER, DEFAULT_RESET_PULSE};
use crate::core::probe::{ClientConfig, ServerConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read
    #[error("Config file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid TOML for [`AppConfig`]
    #[error("Invalid config {path}: {source}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Parser error
        source: toml::de::Error,
    },
}

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Power-control settings
    pub power: PowerSettings,
    /// TCP probe client defaults
    pub client: ClientConfig,
    /// TCP probe server defaults
    pub server: ServerConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load config from `path`, or from the default location if `None`.
    ///
    /// A missing default file yields the built-in defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => match super::default_config_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

/// Power-control settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PowerSettings {
    /// Adapter backend
    pub backend: Backend,
    /// Explicit path to the vendor library
    pub library: Option<PathBuf>,
    /// Marker file path
    pub marker: PathBuf,
    /// Reset pulse width in milliseconds
    pub pulse_ms: u64,
}

impl Default for PowerSettings {
    fn default() -> Self {
        Self {
            backend: Backend::Aardvark,
            library: None,
            marker: PathBuf::from(DEFAULT_MARKER),
            pulse_ms: DEFAULT_RESET_PULSE.as_millis() as u64,
        }
    }
}

impl PowerSettings {
    /// Reset pulse as a duration
    pub fn pulse(&self) -> Duration {
        Duration::from_millis(self.pulse_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::probe::ServerMode;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.power.marker, PathBuf::from("on"));
        assert_eq!(config.power.pulse(), Duration::from_millis(200));
        assert_eq!(config.client.port, 60001);
        assert_eq!(config.server.port, 60002);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[power]
backend = "sim"
pulse_ms = 50

[server]
bind = "0.0.0.0"
mode = "sink"
"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.power.backend, Backend::Sim);
        assert_eq!(config.power.pulse_ms, 50);
        assert_eq!(config.power.marker, PathBuf::from("on"));
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.mode, ServerMode::Sink);
        assert_eq!(config.server.port, 60002);
        assert_eq!(config.client.host, "192.168.1.19");
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/benchctl.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[power]\npulse_ms = \"long\"\n").unwrap();

        let err = AppConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
