//! Serial transport over the `serialport` crate
//!
//! Opens the port 8N1 without flow control and splits the byte stream into
//! `\n`-terminated lines. A read timeout in the middle of a line keeps the
//! bytes received so far; the line is completed by later reads.

use super::transport::{Connection, LinkSettings, ReadOutcome, SerialTransport};
use crate::error::{FreefallError, Result};
use crate::types::PortDescriptor;
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortInfo, SerialPortType, StopBits};
use std::io::{BufRead, BufReader, ErrorKind, Read};

/// Real serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPortTransport;

impl SerialPortTransport {
    pub fn new() -> Self {
        Self
    }
}

/// Display detail for a port listing
fn describe(info: &SerialPortInfo) -> Option<String> {
    match &info.port_type {
        SerialPortType::UsbPort(usb) => {
            let parts: Vec<&str> = [usb.manufacturer.as_deref(), usb.product.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            if parts.is_empty() {
                Some("USB Serial".to_string())
            } else {
                Some(parts.join(" "))
            }
        }
        SerialPortType::BluetoothPort => Some("Bluetooth".to_string()),
        SerialPortType::PciPort => Some("PCI".to_string()),
        SerialPortType::Unknown => None,
    }
}

impl SerialTransport for SerialPortTransport {
    fn available_ports(&self) -> Result<Vec<PortDescriptor>> {
        let ports = serialport::available_ports()?;

        #[allow(unused_mut)]
        let mut descriptors: Vec<PortDescriptor> = ports
            .iter()
            .map(|info| PortDescriptor {
                system_name: info.port_name.clone(),
                detail: describe(info),
            })
            .collect();

        #[cfg(feature = "mock-serial")]
        descriptors.push(super::mock_serial::synthetic_port());

        tracing::debug!("Found {} serial ports", descriptors.len());
        Ok(descriptors)
    }

    fn open(&self, port: &PortDescriptor, settings: &LinkSettings) -> Result<Box<dyn Connection>> {
        #[cfg(feature = "mock-serial")]
        if port.system_name == super::mock_serial::SYNTHETIC_PORT_NAME {
            return Ok(Box::new(super::mock_serial::SyntheticConnection::new(
                settings.read_timeout,
            )));
        }

        let serial = serialport::new(&port.system_name, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(settings.read_timeout)
            .open()
            .map_err(|e| FreefallError::port_unavailable(&port.system_name, e.into()))?;

        tracing::info!(
            "Opened serial port: {} at {} baud",
            port.system_name,
            settings.baud_rate
        );

        Ok(Box::new(SerialConnection::new(&port.system_name, serial)))
    }
}

/// Line reader over an open serial port, or any other byte stream
pub struct SerialConnection<R = Box<dyn SerialPort>> {
    port_name: String,
    reader: Option<BufReader<R>>,
    /// Bytes of the line currently being received
    pending: Vec<u8>,
    /// Set once the stream reported end of data
    at_eof: bool,
}

impl<R: Read> SerialConnection<R> {
    pub fn new(port_name: impl Into<String>, port: R) -> Self {
        Self {
            port_name: port_name.into(),
            reader: Some(BufReader::new(port)),
            pending: Vec::new(),
            at_eof: false,
        }
    }

    fn take_line(&mut self) -> String {
        let bytes = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&bytes);
        line.trim_end_matches(['\n', '\r']).to_string()
    }
}

impl<R: Read + Send> Connection for SerialConnection<R> {
    fn read_line(&mut self) -> ReadOutcome {
        if self.at_eof {
            return ReadOutcome::Eof;
        }
        let Some(reader) = self.reader.as_mut() else {
            return ReadOutcome::Eof;
        };

        match reader.read_until(b'\n', &mut self.pending) {
            Ok(0) if self.pending.is_empty() => {
                self.at_eof = true;
                ReadOutcome::Eof
            }
            Ok(_) => {
                if self.pending.last() != Some(&b'\n') {
                    // Stream ended mid-line; deliver what arrived
                    self.at_eof = true;
                }
                ReadOutcome::Line(self.take_line())
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                ReadOutcome::Timeout
            }
            Err(e) => ReadOutcome::Failed(e),
        }
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            tracing::info!("Closed serial port: {}", self.port_name);
        }
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }
}
