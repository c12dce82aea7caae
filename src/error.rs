//! Error handling for freefall-plot
//!
//! This module defines the error type shared by port selection, the
//! acquisition backend, the time series and configuration, plus a Result
//! alias. Malformed telemetry frames are not errors; see
//! [`crate::parser::FrameRejection`].

use thiserror::Error;

/// Main error type for freefall-plot operations
#[derive(Error, Debug)]
pub enum FreefallError {
    /// Enumeration returned no serial endpoints to choose from
    #[error("No serial ports available")]
    NoPortsAvailable,

    /// The chooser gave up before producing a valid choice
    #[error("Port selection cancelled")]
    SelectionCancelled,

    /// The chooser kept producing invalid input past the configured bound
    #[error("Port selection gave up after {attempts} invalid responses")]
    SelectionExhausted { attempts: u32 },

    /// The serial port could not be opened
    #[error("Could not open port {port}: {source}")]
    PortUnavailable {
        port: String,
        #[source]
        source: Box<FreefallError>,
    },

    /// Errors reported by the serialport crate
    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// A sample was appended with an index other than the next expected one
    #[error("Sample index {got} out of order (expected {expected})")]
    OutOfOrder { expected: u64, got: u64 },

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FreefallError>,
    },
}

impl FreefallError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FreefallError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Wrap an open failure with the name of the port that failed
    pub fn port_unavailable(port: impl Into<String>, source: FreefallError) -> Self {
        FreefallError::PortUnavailable {
            port: port.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error must be reported to the operator as a hard failure
    pub fn is_operator_facing(&self) -> bool {
        match self {
            FreefallError::NoPortsAvailable | FreefallError::PortUnavailable { .. } => true,
            FreefallError::WithContext { source, .. } => source.is_operator_facing(),
            _ => false,
        }
    }
}

/// Result type alias for freefall-plot operations
pub type Result<T> = std::result::Result<T, FreefallError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
