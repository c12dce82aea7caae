//! Integration tests for settings files

use freefall_plot::config::{AppConfig, MAX_READ_TIMEOUT_MS, MIN_READ_TIMEOUT_MS};
use tempfile::TempDir;

#[test]
fn test_settings_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");

    let mut config = AppConfig::default();
    config.serial.port_name = Some("/dev/ttyUSB0".to_string());
    config.serial.read_timeout_ms = 500;
    config.selection.max_attempts = Some(5);
    config.ui.visible_ticks = 1200;
    config.save_to(&path).unwrap();

    let loaded = AppConfig::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_settings_use_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{ "serial": { "baud_rate": 115200 } }"#).unwrap();

    let loaded = AppConfig::load_from(&path).unwrap();
    assert_eq!(loaded.serial.baud_rate, 115200);
    assert_eq!(loaded.serial.read_timeout_ms, 2000);
    assert_eq!(loaded.ui, AppConfig::default().ui);
}

#[test]
fn test_invalid_settings_are_config_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "not json").unwrap();

    let err = AppConfig::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse settings"));

    let missing = AppConfig::load_from(dir.path().join("missing.json"));
    assert!(missing.is_err());
}

#[test]
fn test_validated_clamps_out_of_range_values() {
    let mut config = AppConfig::default();
    config.serial.read_timeout_ms = 10;
    config.serial.baud_rate = 0;
    let config = config.validated();
    assert_eq!(config.serial.read_timeout_ms, MIN_READ_TIMEOUT_MS);
    assert_eq!(config.serial.baud_rate, 9600);

    let mut config = AppConfig::default();
    config.serial.read_timeout_ms = 60_000;
    assert_eq!(config.validated().serial.read_timeout_ms, MAX_READ_TIMEOUT_MS);
}
