//! Daemon settings

use std::path::{Path, PathBuf};

use coop_mux::CoordinatorConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable overriding the settings file location
pub const CONFIG_ENV: &str = "COOP_LIGHT_CONFIG";

/// Errors reading or writing the settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine the settings path")]
    NoPath,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Daemon settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Serial port the radio module is attached to
    pub serial_port: String,
    /// Baud rate of the radio module
    pub baud_rate: u32,
    /// Where the event history is kept (defaults to the config directory)
    pub history_path: Option<PathBuf>,
    /// Live events buffered per dashboard subscriber
    pub event_capacity: usize,
    /// Coordinator configuration
    pub coordinator: CoordinatorConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            serial_port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            history_path: None,
            event_capacity: 64,
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl Settings {
    /// Get the XDG config directory for coop-light
    /// Uses $XDG_CONFIG_HOME/coop-light, falls back to ~/.config/coop-light
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("coop-light"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("coop-light"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Path of the event history file
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_path
            .clone()
            .or_else(|| Self::config_dir().map(|p| p.join("history.json")))
    }

    /// Load settings from disk
    ///
    /// A missing file yields the defaults and is written out so it can be
    /// edited. An unreadable or invalid file also yields the defaults, with a
    /// warning, and is left untouched.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("{}, using defaults", SettingsError::NoPath);
            return Self::default();
        };

        if !path.exists() {
            let settings = Self::default();
            match settings.save_to(&path) {
                Ok(()) => info!("Wrote default settings to {}", path.display()),
                Err(e) => warn!("{}", e),
            }
            return settings;
        }

        Self::load_from(&path).unwrap_or_else(|e| {
            warn!("{}, using defaults", e);
            Self::default()
        })
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|source| SettingsError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save settings to a specific file, creating its directory
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source: std::io::Error| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        std::fs::write(path, json).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("coop-light-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_save_and_load() {
        let path = scratch("settings.json");
        let mut settings = Settings::default();
        settings.serial_port = "/dev/ttyACM3".into();
        settings.coordinator.debounce_delay_ms = 650;

        settings.save_to(&path).unwrap();
        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let path = scratch("partial.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"baud_rate": 57600, "coordinator": {"flow": {"send_poll_ms": 250}}}"#,
        )
        .unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.baud_rate, 57600);
        assert_eq!(loaded.serial_port, "/dev/ttyUSB0");
        assert_eq!(loaded.coordinator.flow.send_poll_ms, 250);
        assert_eq!(loaded.coordinator.flow.overflow_check_ms, 1700);
        assert_eq!(loaded.coordinator.debounce_delay_ms, 800);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let path = scratch("broken.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Settings::load_from(&path),
            Err(SettingsError::Json { .. })
        ));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_explicit_history_path_wins() {
        let settings = Settings {
            history_path: Some(PathBuf::from("/var/lib/coop/history.json")),
            ..Default::default()
        };
        assert_eq!(
            settings.history_path(),
            Some(PathBuf::from("/var/lib/coop/history.json"))
        );
    }
}
