//! Tracing subscriber setup
//!
//! Console output always goes to stderr through a fmt layer. When
//! [`LoggingConfig::log_to_file`] is set, a second layer writes plain-text
//! logs to `freefall.log` through a non-blocking appender; keep the returned
//! guard alive until exit so buffered lines are flushed.

use crate::config::{self, LoggingConfig};
use std::path::PathBuf;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over [`LoggingConfig::default_filter`].
/// Calling this twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let (file_layer, guard) = match file_writer(config) {
        Some((writer, guard)) => (
            Some(fmt::layer().with_ansi(false).with_writer(writer)),
            Some(guard),
        ),
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }

    guard
}

/// Directory the log file goes to, if file logging is enabled
pub fn log_dir(config: &LoggingConfig) -> Option<PathBuf> {
    if !config.log_to_file {
        return None;
    }
    config
        .log_dir
        .clone()
        .or_else(|| config::ensure_app_data_dir().ok())
}

fn file_writer(config: &LoggingConfig) -> Option<(NonBlocking, WorkerGuard)> {
    let dir = log_dir(config)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("freefall")
        .filename_suffix("log")
        .build(&dir);

    match appender {
        Ok(appender) => Some(tracing_appender::non_blocking(appender)),
        Err(e) => {
            eprintln!("Failed to open log file in {:?}: {}", dir, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_log_dir_when_disabled() {
        let config = LoggingConfig::default();
        assert!(log_dir(&config).is_none());
    }

    #[test]
    fn test_explicit_log_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            log_to_file: true,
            log_dir: Some(tmp.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(log_dir(&config), Some(tmp.path().to_path_buf()));
    }

    #[test]
    fn test_file_writer_creates_log() {
        let tmp = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            log_to_file: true,
            log_dir: Some(tmp.path().to_path_buf()),
            ..Default::default()
        };

        let writer = file_writer(&config);
        assert!(writer.is_some());
        drop(writer);
        assert!(tmp.path().join(config::LOG_FILE).exists());
    }
}
