//! Telemetry frame parsing
//!
//! The sensor emits one record per line, four comma-separated fields:
//!
//! ```text
//! <field0>,<field1>,<field2>,<acceleration>
//! ```
//!
//! Only the last field is plotted; the first three are accepted and ignored.
//! There is no framing or checksum, so anything that does not match this
//! shape is rejected and dropped by the caller.

use std::num::ParseFloatError;
use thiserror::Error;

/// Field delimiter used by the sensor firmware
pub const FIELD_DELIMITER: char = ',';

/// Number of fields in a well-formed frame
pub const FIELD_COUNT: usize = 4;

/// Position of the acceleration reading within a frame
pub const ACCELERATION_FIELD: usize = 3;

/// Why a line did not produce a sample
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameRejection {
    /// Blank line; the device has nothing to report yet
    #[error("empty line")]
    Empty,

    /// Wrong number of comma-separated fields
    #[error("expected 4 fields, got {0}")]
    MalformedShape(usize),

    /// The acceleration field is not a number
    #[error("invalid acceleration {raw:?}: {source}")]
    MalformedValue {
        raw: String,
        #[source]
        source: ParseFloatError,
    },

    /// The acceleration field parsed to infinity or NaN
    #[error("non-finite acceleration {raw:?}")]
    NonFinite { raw: String },
}

/// Coarse classification of a rejection, used for counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    Empty,
    Shape,
    Value,
}

impl FrameRejection {
    /// True for the informational "no data yet" case
    pub fn is_empty(&self) -> bool {
        matches!(self, FrameRejection::Empty)
    }

    pub fn kind(&self) -> RejectionKind {
        match self {
            FrameRejection::Empty => RejectionKind::Empty,
            FrameRejection::MalformedShape(_) => RejectionKind::Shape,
            FrameRejection::MalformedValue { .. } | FrameRejection::NonFinite { .. } => {
                RejectionKind::Value
            }
        }
    }
}

/// Parse one line of telemetry into an acceleration value.
///
/// The value is returned exactly as written by the device, without unit
/// conversion. `inf` and `NaN` are rejected since they cannot be plotted.
/// Assigning the sample index is the caller's job.
pub fn parse_frame(line: &str) -> Result<f64, FrameRejection> {
    let line = line.trim();
    if line.is_empty() {
        return Err(FrameRejection::Empty);
    }

    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if fields.len() != FIELD_COUNT {
        return Err(FrameRejection::MalformedShape(fields.len()));
    }

    let raw = fields[ACCELERATION_FIELD].trim();
    let value = raw
        .parse::<f64>()
        .map_err(|source| FrameRejection::MalformedValue {
            raw: raw.to_string(),
            source,
        })?;
    if !value.is_finite() {
        return Err(FrameRejection::NonFinite {
            raw: raw.to_string(),
        });
    }
    Ok(value)
}
