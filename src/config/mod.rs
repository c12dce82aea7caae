//! Configuration module for freefall-plot
//!
//! Settings are stored as JSON in the platform-appropriate data directory
//! under `dev.freefall.plot`:
//!
//! - **Linux**: `~/.local/share/dev.freefall.plot/settings.json`
//! - **macOS**: `~/Library/Application Support/dev.freefall.plot/settings.json`
//! - **Windows**: `%APPDATA%\dev.freefall.plot\settings.json`
//!
//! Every section and field has a default, so a missing or partial file is
//! fine. Nothing about collected data is stored here.
//!
//! # Example
//!
//! ```ignore
//! use freefall_plot::config::AppConfig;
//!
//! let config = AppConfig::load_or_default().validated();
//! assert_eq!(config.serial.baud_rate, 9600);
//! ```

use crate::error::{FreefallError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for data directories
pub const APP_ID: &str = "dev.freefall.plot";

/// Settings filename
pub const SETTINGS_FILE: &str = "settings.json";

/// Log filename (when file logging is enabled)
pub const LOG_FILE: &str = "freefall.log";

/// Baud rate the sensor firmware transmits at
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default per-read timeout in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 2000;

/// Shortest allowed read timeout in milliseconds
pub const MIN_READ_TIMEOUT_MS: u64 = 100;

/// Longest allowed read timeout; keeps shutdown responsive
pub const MAX_READ_TIMEOUT_MS: u64 = 5000;

/// Default capacity of the worker-to-UI message queue
pub const DEFAULT_CHANNEL_BUFFER_SIZE: usize = 10_000;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        FreefallError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            FreefallError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the settings file
pub fn settings_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(SETTINGS_FILE))
}

// ==================== App Config ====================

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    /// Serial link settings
    #[serde(default)]
    pub serial: SerialConfig,

    /// Port selection behaviour
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Acquisition worker settings
    #[serde(default)]
    pub collection: CollectionConfig,

    /// Plot and window settings
    #[serde(default)]
    pub ui: UiConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        let path = settings_path().ok_or_else(|| {
            FreefallError::Config("Could not determine settings path".to_string())
        })?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load settings, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            Self::default()
        })
    }

    /// Load settings from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FreefallError::Config(format!("Failed to read settings {:?}: {}", path, e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            FreefallError::Config(format!("Failed to parse settings {:?}: {}", path, e))
        })
    }

    /// Save settings to an explicit path as pretty JSON
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| FreefallError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            FreefallError::Config(format!("Failed to write settings {:?}: {}", path, e))
        })
    }

    /// Clamp out-of-range values, logging each adjustment
    pub fn validated(mut self) -> Self {
        let timeout = self
            .serial
            .read_timeout_ms
            .clamp(MIN_READ_TIMEOUT_MS, MAX_READ_TIMEOUT_MS);
        if timeout != self.serial.read_timeout_ms {
            tracing::warn!(
                "Read timeout {} ms out of range, using {} ms",
                self.serial.read_timeout_ms,
                timeout
            );
            self.serial.read_timeout_ms = timeout;
        }

        if self.serial.baud_rate == 0 {
            tracing::warn!("Baud rate 0 is invalid, using {}", DEFAULT_BAUD_RATE);
            self.serial.baud_rate = DEFAULT_BAUD_RATE;
        }

        if self.collection.channel_buffer_size == 0 {
            self.collection.channel_buffer_size = 1;
        }

        if self.selection.max_attempts == Some(0) {
            self.selection.max_attempts = Some(1);
        }

        self
    }
}

// ==================== Serial Config ====================

/// Serial link configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate
    pub baud_rate: u32,

    /// Per-read timeout in milliseconds
    pub read_timeout_ms: u64,

    /// Port to use without prompting, if it is present
    pub port_name: Option<String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            port_name: None,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

// ==================== Selection Config ====================

/// Port selection configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SelectionConfig {
    /// Give up after this many invalid responses (None = ask until cancelled)
    pub max_attempts: Option<u32>,
}

// ==================== Collection Config ====================

/// Acquisition worker configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectionConfig {
    /// Capacity of the worker-to-UI message queue
    pub channel_buffer_size: usize,

    /// Interval between statistics updates in milliseconds
    pub stats_interval_ms: u64,

    /// Samples to preallocate in the series
    pub initial_capacity: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: DEFAULT_CHANNEL_BUFFER_SIZE,
            stats_interval_ms: 500,
            initial_capacity: 4096,
        }
    }
}

// ==================== UI Config ====================

/// Plot and window configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    /// Show grid on the plot
    pub show_grid: bool,

    /// Show legend on the plot
    pub show_legend: bool,

    /// Plot line width in pixels
    pub line_width: f32,

    /// Scroll to keep the newest sample in view
    pub follow_latest: bool,

    /// Number of ticks visible while following (0 = whole series)
    pub visible_ticks: u64,

    /// Window size in points
    pub window_size: [f32; 2],

    /// Dark theme
    pub dark_mode: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_grid: true,
            show_legend: true,
            line_width: 1.5,
            follow_latest: true,
            visible_ticks: 500,
            window_size: [800.0, 600.0],
            dark_mode: true,
        }
    }
}

// ==================== Logging Config ====================

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,

    /// Also write logs to a file in the app data directory
    pub log_to_file: bool,

    /// Log file directory (defaults to the app data directory)
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "info,freefall_plot=debug".to_string(),
            log_to_file: false,
            log_dir: None,
        }
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_sensor_link() {
        let config = AppConfig::default();
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.read_timeout(), Duration::from_secs(2));
        assert!(config.serial.port_name.is_none());
        assert!(config.selection.max_attempts.is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "serial": { "port_name": "/dev/ttyACM0" } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.serial.port_name.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.serial.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.ui, UiConfig::default());
    }

    #[test]
    fn test_validated_clamps_timeout() {
        let mut config = AppConfig::default();
        config.serial.read_timeout_ms = 60_000;
        assert_eq!(config.validated().serial.read_timeout_ms, MAX_READ_TIMEOUT_MS);

        let mut config = AppConfig::default();
        config.serial.read_timeout_ms = 1;
        assert_eq!(config.validated().serial.read_timeout_ms, MIN_READ_TIMEOUT_MS);
    }

    #[test]
    fn test_validated_fixes_zero_values() {
        let mut config = AppConfig::default();
        config.serial.baud_rate = 0;
        config.collection.channel_buffer_size = 0;
        config.selection.max_attempts = Some(0);

        let config = config.validated();
        assert_eq!(config.serial.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.collection.channel_buffer_size, 1);
        assert_eq!(config.selection.max_attempts, Some(1));
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut config = AppConfig::default();
        config.serial.port_name = Some("COM3".to_string());
        config.ui.visible_ticks = 0;

        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
