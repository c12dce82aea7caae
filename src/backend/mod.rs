//! Backend module for serial acquisition
//!
//! This module reads the sensor in a separate thread to keep the UI
//! responsive. It uses crossbeam channels for communication with the
//! frontend.
//!
//! # Architecture
//!
//! - [`BackendCommand`] - Messages sent from UI to backend
//! - [`BackendMessage`] - Messages sent from backend to UI (samples, state, errors)
//! - [`FrontendReceiver`] - UI-side handle for sending commands and receiving messages
//! - [`AcquisitionBackend`] - Entry point that owns the worker's inputs and spawns it
//!
//! # Components
//!
//! - [`SerialTransport`] / [`Connection`] - Transport seam
//! - [`SerialPortTransport`] - Real serial ports via the `serialport` crate
//! - [`MockTransport`] - Scripted transport for tests
//! - [`AcquisitionWorker`] - The open/read/close state machine
//!
//! # Example
//!
//! ```ignore
//! use freefall_plot::backend::{AcquisitionBackend, SerialPortTransport};
//! use freefall_plot::config::AppConfig;
//! use std::sync::Arc;
//!
//! let (backend, frontend) =
//!     AcquisitionBackend::new(AppConfig::default(), port, Arc::new(SerialPortTransport));
//! let series = backend.series();
//! let handle = backend.spawn()?;
//!
//! for msg in frontend.drain() {
//!     if let BackendMessage::Sample(sample) = msg {
//!         // plot it
//!     }
//! }
//!
//! frontend.shutdown();
//! let summary = handle.join();
//! ```

pub mod mock_serial;
pub mod serial;
pub mod transport;
pub mod worker;

pub use mock_serial::{MockCounters, MockEvent, MockTransport, ScriptEnd};
pub use serial::{SerialConnection, SerialPortTransport};
pub use transport::{Connection, ConnectionGuard, LinkSettings, ReadOutcome, SerialTransport};
pub use worker::{AcquisitionSummary, AcquisitionWorker, ExitReason};

use crate::config::AppConfig;
use crate::parser::FrameRejection;
use crate::series::SharedTimeSeries;
use crate::types::{AcquisitionState, AcquisitionStats, PortDescriptor, Sample};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Capacity of the lossless queue for state and terminal messages
pub const CONTROL_CHANNEL_SIZE: usize = 16;

/// Message sent from the UI to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    /// Stop reading and close the port
    Shutdown,
}

/// Message sent from the backend to the UI
#[derive(Debug, Clone)]
pub enum BackendMessage {
    /// Acquisition state changed
    StateChanged(AcquisitionState),
    /// The port could not be opened; the run is over
    PortUnavailable { port: String, error: String },
    /// A sample was appended to the series
    Sample(Sample),
    /// A line was dropped as malformed
    FrameRejected { line: String, reason: FrameRejection },
    /// Unrecoverable read error; the run is over
    ReadError(String),
    /// Statistics update
    Stats(AcquisitionStats),
    /// Backend is shutting down
    Shutdown,
}

/// Cross-thread redraw trigger.
///
/// The worker calls this after each append; it must not touch UI state
/// itself, only wake the UI thread.
pub trait RedrawSignal: Send + Sync {
    fn request_redraw(&self);
}

/// Redraw signal that does nothing, for headless runs
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRedraw;

impl RedrawSignal for NoRedraw {
    fn request_redraw(&self) {}
}

/// Frontend receiver for backend messages
pub struct FrontendReceiver {
    /// Receiver for samples and periodic updates (lossy)
    pub receiver: Receiver<BackendMessage>,
    /// Receiver for state and terminal messages (lossless)
    pub control: Receiver<BackendMessage>,
    /// Sender for commands to the backend
    pub command_sender: Sender<BackendCommand>,
}

impl FrontendReceiver {
    /// Receive all pending messages, data first and control last
    ///
    /// Control messages are read after the data queue so the final stats
    /// and `Shutdown` are applied after any sample sent before them.
    pub fn drain(&self) -> Vec<BackendMessage> {
        let mut messages: Vec<BackendMessage> = self.receiver.try_iter().collect();
        messages.extend(self.control.try_iter());
        messages
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        let _ = self.command_sender.send(BackendCommand::Shutdown);
    }
}

/// The acquisition backend that runs in a separate thread
pub struct AcquisitionBackend {
    /// Configuration
    config: AppConfig,
    /// Port to read from
    port: PortDescriptor,
    /// Transport used to open the port
    transport: Arc<dyn SerialTransport>,
    /// Series the worker appends to
    series: SharedTimeSeries,
    /// Receiver for commands from the UI
    command_receiver: Receiver<BackendCommand>,
    /// Lossy sender for messages to the UI
    message_sender: Sender<BackendMessage>,
    /// Lossless sender for state and terminal messages
    control_sender: Sender<BackendMessage>,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Wakes the UI after appends
    redraw: Arc<dyn RedrawSignal>,
}

impl AcquisitionBackend {
    /// Create a new backend with communication channels
    pub fn new(
        config: AppConfig,
        port: PortDescriptor,
        transport: Arc<dyn SerialTransport>,
    ) -> (Self, FrontendReceiver) {
        let (cmd_tx, cmd_rx) = bounded(16);
        // Bounded for backpressure; the worker drops notifications rather than block
        let (msg_tx, msg_rx) = bounded(config.collection.channel_buffer_size.max(1));
        let (ctl_tx, ctl_rx) = bounded(CONTROL_CHANNEL_SIZE);
        let series = SharedTimeSeries::with_capacity(config.collection.initial_capacity);

        let backend = Self {
            config,
            port,
            transport,
            series,
            command_receiver: cmd_rx,
            message_sender: msg_tx,
            control_sender: ctl_tx,
            running: Arc::new(AtomicBool::new(true)),
            redraw: Arc::new(NoRedraw),
        };

        let frontend = FrontendReceiver {
            receiver: msg_rx,
            control: ctl_rx,
            command_sender: cmd_tx,
        };

        (backend, frontend)
    }

    /// Set the signal used to wake the UI after each append
    pub fn with_redraw(mut self, redraw: Arc<dyn RedrawSignal>) -> Self {
        self.redraw = redraw;
        self
    }

    /// Handle to the series this run appends to
    pub fn series(&self) -> SharedTimeSeries {
        self.series.clone()
    }

    /// Get a handle to stop the backend
    ///
    /// Storing `false` makes the worker close the port at its next read
    /// boundary.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Run the acquisition on the calling thread until it ends
    pub fn run(self) -> AcquisitionSummary {
        let worker = AcquisitionWorker::new(
            &self.config,
            self.port,
            self.transport,
            self.series,
            self.command_receiver,
            self.message_sender,
            self.control_sender,
            self.running,
            self.redraw,
        );
        worker.run()
    }

    /// Run the acquisition on a dedicated thread
    pub fn spawn(self) -> std::io::Result<JoinHandle<AcquisitionSummary>> {
        std::thread::Builder::new()
            .name("acquisition".to_string())
            .spawn(move || self.run())
    }
}

/// Signal every worker holding `handle` to stop
pub fn request_stop(handle: &AtomicBool) {
    handle.store(false, Ordering::SeqCst);
}
