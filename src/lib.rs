//! # freefall-plot: live serial acceleration plotter
//!
//! Reads line-delimited telemetry frames from a free-fall acceleration sensor
//! on a serial port and plots the acceleration against a sample counter in
//! real time.
//!
//! ## Architecture
//!
//! - **Selector**: Enumerates serial ports and asks a chooser for one
//! - **Backend**: Owns the serial connection on a worker thread, parses frames
//!   and appends samples to a shared time series
//! - **Frontend**: Renders the series with eframe/egui and egui_plot
//! - **Communication**: Crossbeam channels for thread-safe data transfer
//!
//! ## Wire format
//!
//! One record per `\n`-terminated line, four comma-separated fields. Only the
//! fourth field is used: it is the acceleration as a decimal float.
//!
//! ```text
//! 1,2,3,9.81
//! ```
//!
//! ## Configuration
//!
//! Settings are stored in the platform-appropriate data directory under
//! `dev.freefall.plot`:
//!
//! - **Linux**: `~/.local/share/dev.freefall.plot/`
//! - **macOS**: `~/Library/Application Support/dev.freefall.plot/`
//! - **Windows**: `%APPDATA%\dev.freefall.plot\`
//!
//! ## Example
//!
//! ```ignore
//! use freefall_plot::{
//!     backend::{AcquisitionBackend, SerialPortTransport},
//!     config::AppConfig,
//!     selector::{self, ScriptedChooser, SelectionPolicy},
//! };
//! use std::sync::Arc;
//!
//! let config = AppConfig::load_or_default();
//! let transport = Arc::new(SerialPortTransport::new());
//! let ports = selector::enumerate(transport.as_ref())?;
//! let port = selector::select(&ports, &mut ScriptedChooser::new(["1"]), &SelectionPolicy::default())?;
//!
//! let (backend, frontend) = AcquisitionBackend::new(config, port, transport);
//! let handle = backend.spawn()?;
//! // ... drain `frontend` on the UI thread ...
//! frontend.shutdown();
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod frontend;
pub mod logging;
pub mod parser;
pub mod selector;
pub mod series;
pub mod types;

// Re-export commonly used types
pub use backend::{AcquisitionBackend, BackendCommand, BackendMessage, FrontendReceiver};
pub use config::AppConfig;
pub use error::{FreefallError, Result};
pub use frontend::FreefallApp;
pub use parser::{parse_frame, FrameRejection};
pub use series::{SharedTimeSeries, TimeSeries};
pub use types::{PortDescriptor, Sample};
