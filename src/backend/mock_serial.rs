//! Mock serial transports for testing
//!
//! [`MockTransport`] replays a fixed script of read events and counts how
//! often connections are opened and closed, so tests can drive the
//! acquisition worker without hardware.
//!
//! With the `mock-serial` feature, [`SyntheticConnection`] additionally
//! appears in the real port list as `mock://freefall` and generates a
//! repeating drop profile:
//!
//! ```bash
//! cargo run --features mock-serial
//! ```

use super::transport::{Connection, LinkSettings, ReadOutcome, SerialTransport};
use crate::error::{FreefallError, Result};
use crate::types::PortDescriptor;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted read result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    /// Deliver a line
    Line(String),
    /// Report a read timeout immediately
    Timeout,
    /// Report end of stream
    Eof,
    /// Report an I/O error of this kind
    Fail(std::io::ErrorKind),
}

impl MockEvent {
    pub fn line(text: impl Into<String>) -> Self {
        MockEvent::Line(text.into())
    }
}

/// What a mock connection does once its script is exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptEnd {
    /// Report end of stream
    #[default]
    Eof,
    /// Block for the read timeout and report a timeout, forever
    Idle,
}

/// Open/close counters shared between a transport and its connections
#[derive(Debug, Clone, Default)]
pub struct MockCounters {
    opens: Arc<AtomicUsize>,
    close_calls: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
}

impl MockCounters {
    /// Successful open calls
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Calls to [`Connection::close`], including repeated ones
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Calls to [`Connection::read_line`]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

/// Scripted transport
#[derive(Debug)]
pub struct MockTransport {
    ports: Vec<PortDescriptor>,
    script: Mutex<Vec<MockEvent>>,
    end: ScriptEnd,
    fail_open: bool,
    counters: MockCounters,
}

impl MockTransport {
    /// Transport listing the given port names
    pub fn new<I, S>(port_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ports: port_names.into_iter().map(PortDescriptor::new).collect(),
            script: Mutex::new(Vec::new()),
            end: ScriptEnd::Eof,
            fail_open: false,
            counters: MockCounters::default(),
        }
    }

    /// Script the next opened connection with these lines
    pub fn with_lines<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_events(lines.into_iter().map(MockEvent::line))
    }

    /// Script the next opened connection with these events
    pub fn with_events(self, events: impl IntoIterator<Item = MockEvent>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            *script = events.into_iter().collect();
        }
        self
    }

    /// Behaviour after the script runs out
    pub fn with_end(mut self, end: ScriptEnd) -> Self {
        self.end = end;
        self
    }

    /// Make every open attempt fail
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Handle to the counters; stays valid after the transport moves
    pub fn counters(&self) -> MockCounters {
        self.counters.clone()
    }
}

impl SerialTransport for MockTransport {
    fn available_ports(&self) -> Result<Vec<PortDescriptor>> {
        Ok(self.ports.clone())
    }

    fn open(&self, port: &PortDescriptor, settings: &LinkSettings) -> Result<Box<dyn Connection>> {
        if self.fail_open || !self.ports.contains(port) {
            let err = std::io::Error::new(std::io::ErrorKind::NotFound, "mock port unavailable");
            return Err(FreefallError::port_unavailable(&port.system_name, err.into()));
        }

        let events = self
            .script
            .lock()
            .map(|mut script| std::mem::take(&mut *script))
            .unwrap_or_default();

        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            events: events.into(),
            end: self.end,
            read_timeout: settings.read_timeout,
            open: true,
            counters: self.counters.clone(),
        }))
    }
}

/// Connection replaying a [`MockTransport`] script
#[derive(Debug)]
pub struct MockConnection {
    events: VecDeque<MockEvent>,
    end: ScriptEnd,
    read_timeout: Duration,
    open: bool,
    counters: MockCounters,
}

impl Connection for MockConnection {
    fn read_line(&mut self) -> ReadOutcome {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        if !self.open {
            return ReadOutcome::Eof;
        }

        match self.events.pop_front() {
            Some(MockEvent::Line(line)) => ReadOutcome::Line(line),
            Some(MockEvent::Timeout) => ReadOutcome::Timeout,
            Some(MockEvent::Eof) => ReadOutcome::Eof,
            Some(MockEvent::Fail(kind)) => {
                ReadOutcome::Failed(std::io::Error::new(kind, "mock read failure"))
            }
            None => match self.end {
                ScriptEnd::Eof => ReadOutcome::Eof,
                ScriptEnd::Idle => {
                    std::thread::sleep(self.read_timeout);
                    ReadOutcome::Timeout
                }
            },
        }
    }

    fn close(&mut self) {
        self.counters.close_calls.fetch_add(1, Ordering::SeqCst);
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Name of the synthetic port added by the `mock-serial` feature
#[cfg(feature = "mock-serial")]
pub const SYNTHETIC_PORT_NAME: &str = "mock://freefall";

#[cfg(feature = "mock-serial")]
pub fn synthetic_port() -> PortDescriptor {
    PortDescriptor::new(SYNTHETIC_PORT_NAME).with_detail("Synthetic free-fall sensor")
}

/// Generates frames for a sensor that rests, drops, and lands, repeatedly.
///
/// At rest the sensor reads about 9.81; in free fall about 0; the landing
/// produces a short spike.
#[cfg(feature = "mock-serial")]
pub struct SyntheticConnection {
    tick: u64,
    interval: Duration,
    open: bool,
}

#[cfg(feature = "mock-serial")]
impl SyntheticConnection {
    /// Ticks per rest/drop/impact cycle
    const CYCLE: u64 = 200;

    pub fn new(read_timeout: Duration) -> Self {
        Self {
            tick: 0,
            interval: Duration::from_millis(20).min(read_timeout),
            open: true,
        }
    }

    fn acceleration(tick: u64) -> f64 {
        let phase = tick % Self::CYCLE;
        let jitter = ((tick * 7919) % 100) as f64 / 1000.0 - 0.05;
        match phase {
            0..=119 => 9.81 + jitter,
            120..=169 => jitter,
            170..=174 => 25.0 - (phase - 170) as f64 * 3.0 + jitter,
            _ => 9.81 + jitter,
        }
    }
}

#[cfg(feature = "mock-serial")]
impl Connection for SyntheticConnection {
    fn read_line(&mut self) -> ReadOutcome {
        if !self.open {
            return ReadOutcome::Eof;
        }
        std::thread::sleep(self.interval);
        self.tick += 1;
        let a = Self::acceleration(self.tick);
        ReadOutcome::Line(format!("{},{:.2},{:.2},{:.3}", self.tick, 0.0, 0.0, a))
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LinkSettings {
        LinkSettings {
            baud_rate: 9600,
            read_timeout: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_replays_script() {
        let transport = MockTransport::new(["A"]).with_events([
            MockEvent::line("1,2,3,4"),
            MockEvent::Timeout,
            MockEvent::Fail(std::io::ErrorKind::BrokenPipe),
        ]);
        let mut conn = transport.open(&PortDescriptor::new("A"), &settings()).unwrap();

        assert!(matches!(conn.read_line(), ReadOutcome::Line(l) if l == "1,2,3,4"));
        assert!(matches!(conn.read_line(), ReadOutcome::Timeout));
        assert!(matches!(conn.read_line(), ReadOutcome::Failed(_)));
        assert!(matches!(conn.read_line(), ReadOutcome::Eof));
    }

    #[test]
    fn test_counts_opens_and_closes() {
        let transport = MockTransport::new(["A"]);
        let counters = transport.counters();

        let mut conn = transport.open(&PortDescriptor::new("A"), &settings()).unwrap();
        assert!(conn.is_open());
        conn.close();
        assert!(!conn.is_open());

        assert_eq!(counters.opens(), 1);
        assert_eq!(counters.close_calls(), 1);
    }

    #[test]
    fn test_unknown_port_fails() {
        let transport = MockTransport::new(["A"]);
        let result = transport.open(&PortDescriptor::new("B"), &settings());
        assert!(matches!(result, Err(FreefallError::PortUnavailable { .. })));
        assert_eq!(transport.counters().opens(), 0);
    }

    #[test]
    fn test_idle_end_times_out() {
        let transport = MockTransport::new(["A"]).with_end(ScriptEnd::Idle);
        let mut conn = transport.open(&PortDescriptor::new("A"), &settings()).unwrap();
        assert!(matches!(conn.read_line(), ReadOutcome::Timeout));
    }

    #[cfg(feature = "mock-serial")]
    #[test]
    fn test_synthetic_frames_parse() {
        let mut conn = SyntheticConnection::new(Duration::from_millis(1));
        for _ in 0..5 {
            match conn.read_line() {
                ReadOutcome::Line(line) => assert!(crate::parser::parse_frame(&line).is_ok()),
                other => panic!("unexpected {:?}", other),
            }
        }
    }
}
