//! Builders for scripted serial streams

use freefall_plot::backend::MockEvent;

/// Builds the event script for a [`freefall_plot::backend::MockTransport`]
#[derive(Debug, Default)]
pub struct StreamBuilder {
    events: Vec<MockEvent>,
    valid: usize,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A well-formed frame carrying `value`
    pub fn frame(mut self, value: f64) -> Self {
        let n = self.valid;
        self.events
            .push(MockEvent::line(format!("{},{},{},{}", n, n + 1, n + 2, value)));
        self.valid += 1;
        self
    }

    pub fn raw(mut self, line: &str) -> Self {
        self.events.push(MockEvent::line(line));
        self
    }

    pub fn empty(self) -> Self {
        self.raw("")
    }

    pub fn wrong_shape(self) -> Self {
        self.raw("1,2,3")
    }

    pub fn bad_value(self) -> Self {
        self.raw("1,2,3,not-a-number")
    }

    pub fn timeout(mut self) -> Self {
        self.events.push(MockEvent::Timeout);
        self
    }

    pub fn fail(mut self, kind: std::io::ErrorKind) -> Self {
        self.events.push(MockEvent::Fail(kind));
        self
    }

    /// Number of well-formed frames added so far
    pub fn valid_frames(&self) -> usize {
        self.valid
    }

    pub fn build(self) -> Vec<MockEvent> {
        self.events
    }
}
