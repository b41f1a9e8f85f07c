//! Configuration module
//!
//! Handles the optional TOML settings file shared by both tools

mod settings;

pub use settings::{AppConfig, ConfigError, PowerSettings};

use directories::ProjectDirs;
use std::path::PathBuf;

/// Get the application configuration directory
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "benchctl", "Benchctl").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default configuration file location
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}
