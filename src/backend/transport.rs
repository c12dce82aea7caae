//! Serial transport traits
//!
//! The acquisition worker talks to the device only through these traits, so
//! the real serial port ([`super::serial::SerialPortTransport`]) and the
//! scripted test transport ([`super::mock_serial::MockTransport`]) are
//! interchangeable.

use crate::error::Result;
use crate::types::PortDescriptor;
use std::time::Duration;

/// Link parameters used when opening a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    /// Baud rate
    pub baud_rate: u32,
    /// Upper bound on how long a single read may block
    pub read_timeout: Duration,
}

impl From<&crate::config::SerialConfig> for LinkSettings {
    fn from(config: &crate::config::SerialConfig) -> Self {
        Self {
            baud_rate: config.baud_rate,
            read_timeout: config.read_timeout(),
        }
    }
}

/// Result of one bounded line read
#[derive(Debug)]
pub enum ReadOutcome {
    /// A complete line, without its terminator
    Line(String),
    /// Nothing arrived within the read timeout
    Timeout,
    /// The device went away or the stream ended
    Eof,
    /// Unrecoverable read error
    Failed(std::io::Error),
}

/// Source of serial connections
pub trait SerialTransport: Send + Sync {
    /// List the ports currently present. Each call re-queries the system.
    fn available_ports(&self) -> Result<Vec<PortDescriptor>>;

    /// Open `port` with the given link settings
    fn open(&self, port: &PortDescriptor, settings: &LinkSettings) -> Result<Box<dyn Connection>>;
}

/// An open, line-oriented serial connection
///
/// Implementations must be `Send` so the connection can move to the worker
/// thread.
pub trait Connection: Send {
    /// Read one line, blocking for at most the configured read timeout
    fn read_line(&mut self) -> ReadOutcome;

    /// Release the port. Calling this on a closed connection does nothing.
    fn close(&mut self);

    /// Whether the port is still held
    fn is_open(&self) -> bool;
}

/// Owns a [`Connection`] for the duration of an acquisition run and closes it
/// exactly once, on whichever exit path comes first.
pub struct ConnectionGuard {
    connection: Box<dyn Connection>,
    closed: bool,
}

impl ConnectionGuard {
    pub fn new(connection: Box<dyn Connection>) -> Self {
        Self {
            connection,
            closed: false,
        }
    }

    pub fn read_line(&mut self) -> ReadOutcome {
        if self.closed {
            return ReadOutcome::Eof;
        }
        self.connection.read_line()
    }

    /// Close the connection. Returns false if it was already closed.
    pub fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.connection.close();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.close() {
            tracing::debug!("Connection closed on guard drop");
        }
    }
}
