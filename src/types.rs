//! Core data types for freefall-plot
//!
//! # Main Types
//!
//! - [`Sample`] - One validated acceleration reading with its synthetic index
//! - [`PortDescriptor`] - An enumerable serial endpoint
//! - [`AcquisitionState`] - Lifecycle of one acquisition run
//! - [`AcquisitionStats`] - Counters reported by the acquisition worker

use crate::parser::RejectionKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum number of points to render per line for performance
pub const MAX_RENDER_POINTS: usize = 2000;

/// A single acceleration reading.
///
/// `index` is assigned at ingestion time and counts accepted frames, it is
/// not taken from the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Tick number, starting at 0 for each acquisition run
    pub index: u64,
    /// Acceleration as reported by the sensor
    pub value: f64,
}

impl Sample {
    pub fn new(index: u64, value: f64) -> Self {
        Self { index, value }
    }
}

/// One serial endpoint as reported by enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    /// Name the OS uses to open the port (e.g. `/dev/ttyUSB0`, `COM3`)
    pub system_name: String,
    /// Human-readable detail for listings (USB product, Bluetooth, ...)
    #[serde(default)]
    pub detail: Option<String>,
}

impl PortDescriptor {
    pub fn new(system_name: impl Into<String>) -> Self {
        Self {
            system_name: system_name.into(),
            detail: None,
        }
    }

    /// Attach a display detail
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", self.system_name, detail),
            None => write!(f, "{}", self.system_name),
        }
    }
}

/// Lifecycle of one acquisition run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquisitionState {
    /// Opening the serial port
    #[default]
    Opening,
    /// Port open, reading lines
    Reading,
    /// Releasing the port
    Closing,
    /// Terminal; the port is closed
    Closed,
}

impl AcquisitionState {
    /// Whether the port may currently be open
    pub fn is_active(&self) -> bool {
        matches!(self, AcquisitionState::Opening | AcquisitionState::Reading)
    }
}

impl std::fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquisitionState::Opening => write!(f, "Opening"),
            AcquisitionState::Reading => write!(f, "Reading"),
            AcquisitionState::Closing => write!(f, "Closing"),
            AcquisitionState::Closed => write!(f, "Closed"),
        }
    }
}

/// Counters for one acquisition run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcquisitionStats {
    /// Frames parsed and appended to the series
    pub accepted: u64,
    /// Frames with the wrong number of fields
    pub malformed_shape: u64,
    /// Frames whose acceleration field was not a number
    pub malformed_value: u64,
    /// Blank lines
    pub empty_lines: u64,
    /// Reads that returned no data within the timeout
    pub timeouts: u64,
    /// Sample notifications dropped because the UI queue was full
    pub dropped_notifications: u64,
    /// Time since the port was opened
    pub elapsed: Duration,
}

impl AcquisitionStats {
    /// Total malformed frames
    pub fn rejected(&self) -> u64 {
        self.malformed_shape + self.malformed_value
    }

    /// Count a rejection by kind
    pub fn record_rejection(&mut self, kind: RejectionKind) {
        match kind {
            RejectionKind::Empty => self.empty_lines += 1,
            RejectionKind::Shape => self.malformed_shape += 1,
            RejectionKind::Value => self.malformed_value += 1,
        }
    }

    /// Accepted samples per second over the run
    pub fn sample_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            0.0
        } else {
            self.accepted as f64 / secs
        }
    }
}
