//! Serial port enumeration and selection
//!
//! [`select`] asks a [`Chooser`] for a 1-based position until it gets a valid
//! one. Invalid answers are logged and asked again; the chooser ends the loop
//! by cancelling, and [`SelectionPolicy::max_attempts`] can bound it as well.

use crate::backend::transport::SerialTransport;
use crate::config::SelectionConfig;
use crate::error::{FreefallError, Result, ResultExt};
use crate::types::PortDescriptor;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::ops::RangeInclusive;

/// One answer from a chooser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// Raw text, expected to hold a position within the offered range
    Token(String),
    /// The chooser gave up
    Cancel,
}

impl Choice {
    pub fn token(text: impl Into<String>) -> Self {
        Choice::Token(text.into())
    }
}

/// Source of port choices
pub trait Chooser {
    /// Return a token for a position in `range` (1-based, inclusive), or cancel
    fn choose(&mut self, range: RangeInclusive<usize>) -> Choice;
}

/// Limits on how long [`select`] keeps asking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Invalid responses tolerated before giving up; `None` asks forever
    pub max_attempts: Option<u32>,
}

impl SelectionPolicy {
    pub fn unbounded() -> Self {
        Self { max_attempts: None }
    }

    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }
}

impl From<&SelectionConfig> for SelectionPolicy {
    fn from(config: &SelectionConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
        }
    }
}

/// List the ports the transport currently sees, in transport order
pub fn enumerate(transport: &dyn SerialTransport) -> Result<Vec<PortDescriptor>> {
    let ports = transport
        .available_ports()
        .context("Failed to enumerate serial ports")?;
    tracing::info!("{} serial port(s) available", ports.len());
    Ok(ports)
}

/// Numbered listing used before prompting, one `N: name` line per port
pub fn describe_ports(ports: &[PortDescriptor]) -> String {
    ports
        .iter()
        .enumerate()
        .map(|(i, port)| format!("{}: {}\n", i + 1, port))
        .collect()
}

/// Ask `chooser` until it names one of `ports`
pub fn select(
    ports: &[PortDescriptor],
    chooser: &mut dyn Chooser,
    policy: &SelectionPolicy,
) -> Result<PortDescriptor> {
    if ports.is_empty() {
        return Err(FreefallError::NoPortsAvailable);
    }

    let range = 1..=ports.len();
    let mut invalid: u32 = 0;

    loop {
        let token = match chooser.choose(range.clone()) {
            Choice::Token(token) => token,
            Choice::Cancel => {
                tracing::info!("Port selection cancelled");
                return Err(FreefallError::SelectionCancelled);
            }
        };

        match parse_position(&token, &range) {
            Some(position) => {
                let port = ports[position - 1].clone();
                tracing::info!("Selected port {}: {}", position, port);
                return Ok(port);
            }
            None => {
                invalid += 1;
                tracing::warn!(
                    "Invalid port choice {:?}, expected {}-{}",
                    token,
                    range.start(),
                    range.end()
                );
                if let Some(max) = policy.max_attempts {
                    if invalid >= max {
                        return Err(FreefallError::SelectionExhausted { attempts: invalid });
                    }
                }
            }
        }
    }
}

fn parse_position(token: &str, range: &RangeInclusive<usize>) -> Option<usize> {
    token
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| range.contains(n))
}

/// Line-based prompt, used on stdin/stderr by the binary
///
/// End of input, a read error, or `q`/`quit` cancels.
pub struct PromptChooser<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptChooser<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Give back the underlying reader and writer
    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl<R: BufRead, W: Write> Chooser for PromptChooser<R, W> {
    fn choose(&mut self, range: RangeInclusive<usize>) -> Choice {
        let prompt = write!(self.output, "Select port ({}-{}): ", range.start(), range.end())
            .and_then(|_| self.output.flush());
        if let Err(e) = prompt {
            tracing::warn!("Failed to write prompt: {}", e);
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => Choice::Cancel,
            Ok(_) => {
                let answer = line.trim();
                if answer.eq_ignore_ascii_case("q") || answer.eq_ignore_ascii_case("quit") {
                    Choice::Cancel
                } else {
                    Choice::Token(answer.to_string())
                }
            }
            Err(e) => {
                tracing::error!("Failed to read port choice: {}", e);
                Choice::Cancel
            }
        }
    }
}

/// Replays fixed tokens, then cancels
#[derive(Debug, Clone, Default)]
pub struct ScriptedChooser {
    tokens: VecDeque<String>,
    calls: usize,
}

impl ScriptedChooser {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            calls: 0,
        }
    }

    /// Number of times `choose` was called
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Chooser for ScriptedChooser {
    fn choose(&mut self, _range: RangeInclusive<usize>) -> Choice {
        self.calls += 1;
        match self.tokens.pop_front() {
            Some(token) => Choice::Token(token),
            None => Choice::Cancel,
        }
    }
}

/// Picks a port named in configuration
///
/// Answers once with the position of the named port, then cancels.
#[derive(Debug, Clone)]
pub struct FixedChooser {
    position: Option<usize>,
}

impl FixedChooser {
    /// Resolve `port_name` against `ports`; `None` if it is not present
    pub fn resolve(port_name: &str, ports: &[PortDescriptor]) -> Option<Self> {
        ports
            .iter()
            .position(|p| p.system_name == port_name)
            .map(|i| Self {
                position: Some(i + 1),
            })
    }
}

impl Chooser for FixedChooser {
    fn choose(&mut self, _range: RangeInclusive<usize>) -> Choice {
        match self.position.take() {
            Some(position) => Choice::Token(position.to_string()),
            None => Choice::Cancel,
        }
    }
}
