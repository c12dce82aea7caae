//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use freefall_plot::backend::{AcquisitionBackend, AcquisitionSummary, BackendMessage, MockTransport};
use freefall_plot::config::AppConfig;
use freefall_plot::types::{PortDescriptor, Sample};
use freefall_plot::SharedTimeSeries;
use std::sync::Arc;
use std::time::Duration;

/// Read timeout used by tests that block on an idle port
pub fn test_timeout() -> Duration {
    Duration::from_millis(100)
}

/// Config with a short read timeout
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.serial.read_timeout_ms = test_timeout().as_millis() as u64;
    config
}

/// Result of running a backend to completion on the test thread
pub struct Run {
    pub summary: AcquisitionSummary,
    pub messages: Vec<BackendMessage>,
    pub series: SharedTimeSeries,
}

impl Run {
    pub fn samples_sent(&self) -> Vec<Sample> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                BackendMessage::Sample(s) => Some(*s),
                _ => None,
            })
            .collect()
    }
}

/// Run a backend on port "A" against `transport` until it ends
pub fn run_on_port_a(transport: MockTransport) -> Run {
    let (backend, frontend) =
        AcquisitionBackend::new(test_config(), PortDescriptor::new("A"), Arc::new(transport));
    let series = backend.series();
    let summary = backend.run();

    Run {
        summary,
        messages: frontend.drain(),
        series,
    }
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
