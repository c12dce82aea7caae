//! Acquisition Worker Implementation
//!
//! This module contains the loop that owns the serial connection for one
//! acquisition run. It communicates with the UI thread through crossbeam
//! channels.
//!
//! # States
//!
//! ```text
//! Opening --open ok--> Reading --EOF / I/O error / stop--> Closing --> Closed
//!    \________________open failed_____________________________________^
//! ```
//!
//! Read timeouts, blank lines and malformed frames are counted and logged
//! but never leave `Reading`. Nothing is retried: an open failure or a dead
//! stream ends the run.
//!
//! # Shutdown
//!
//! The running flag and the command channel are checked before every read
//! and again after it returns, so a stop request is honoured within one read
//! timeout and no sample is appended once it has been seen. The connection
//! lives in a [`ConnectionGuard`], which closes it exactly once whichever way
//! the loop ends.
//!
//! # Queues
//!
//! Samples, rejections and periodic stats go on the data queue with
//! `try_send` and are dropped when it is full. State changes, errors, the
//! final stats and `Shutdown` go on the control queue, which is never lossy.

use crate::backend::transport::{ConnectionGuard, LinkSettings, ReadOutcome, SerialTransport};
use crate::backend::{BackendCommand, BackendMessage, RedrawSignal, CONTROL_CHANNEL_SIZE};
use crate::config::AppConfig;
use crate::parser::parse_frame;
use crate::series::SharedTimeSeries;
use crate::types::{AcquisitionState, AcquisitionStats, PortDescriptor, Sample};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why an acquisition run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Stop flag, shutdown command, or the UI went away
    Cancelled,
    /// The device closed the stream
    EndOfStream,
    /// Unrecoverable read error
    ReadFailed(String),
    /// The port could not be opened
    PortUnavailable(String),
}

impl ExitReason {
    /// Whether the operator needs to be told the run failed
    pub fn is_failure(&self) -> bool {
        matches!(self, ExitReason::ReadFailed(_) | ExitReason::PortUnavailable(_))
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::Cancelled => write!(f, "cancelled"),
            ExitReason::EndOfStream => write!(f, "end of stream"),
            ExitReason::ReadFailed(e) => write!(f, "read failed: {}", e),
            ExitReason::PortUnavailable(e) => write!(f, "port unavailable: {}", e),
        }
    }
}

/// Outcome of a finished run
#[derive(Debug, Clone)]
pub struct AcquisitionSummary {
    pub exit_reason: ExitReason,
    pub final_state: AcquisitionState,
    pub stats: AcquisitionStats,
}

/// The worker that runs the read loop
pub struct AcquisitionWorker {
    /// Port to open
    port: PortDescriptor,
    /// Baud rate and read timeout
    link: LinkSettings,
    /// Transport used to open the port
    transport: Arc<dyn SerialTransport>,
    /// Series to append accepted samples to
    series: SharedTimeSeries,
    /// Command receiver from the UI
    command_rx: Receiver<BackendCommand>,
    /// Lossy sender for samples and periodic updates
    message_tx: Sender<BackendMessage>,
    /// Lossless sender for state and terminal messages
    control_tx: Sender<BackendMessage>,
    /// Running flag
    running: Arc<AtomicBool>,
    /// UI wake-up after appends
    redraw: Arc<dyn RedrawSignal>,
    /// Current state
    state: AcquisitionState,
    /// Index for the next accepted sample
    next_index: u64,
    /// Statistics
    stats: AcquisitionStats,
    /// How often stats are pushed to the UI
    stats_interval: Duration,
    /// When the port was opened
    opened_at: Option<Instant>,
    /// Last time stats were sent to UI
    last_stats_time: Instant,
}

impl AcquisitionWorker {
    /// Create a new worker
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &AppConfig,
        port: PortDescriptor,
        transport: Arc<dyn SerialTransport>,
        series: SharedTimeSeries,
        command_rx: Receiver<BackendCommand>,
        message_tx: Sender<BackendMessage>,
        control_tx: Sender<BackendMessage>,
        running: Arc<AtomicBool>,
        redraw: Arc<dyn RedrawSignal>,
    ) -> Self {
        let next_index = series.next_index();
        Self {
            port,
            link: LinkSettings::from(&config.serial),
            transport,
            series,
            command_rx,
            message_tx,
            control_tx,
            running,
            redraw,
            state: AcquisitionState::Opening,
            next_index,
            stats: AcquisitionStats::default(),
            stats_interval: Duration::from_millis(config.collection.stats_interval_ms.max(1)),
            opened_at: None,
            last_stats_time: Instant::now(),
        }
    }

    /// Run the acquisition to completion
    pub fn run(mut self) -> AcquisitionSummary {
        tracing::info!("Acquisition worker started for {}", self.port);
        self.update_state(AcquisitionState::Opening);

        self.process_commands();
        if !self.is_running() {
            tracing::info!("Stopped before opening {}", self.port);
            self.update_state(AcquisitionState::Closed);
            return self.finish(ExitReason::Cancelled);
        }

        let connection = match self.transport.open(&self.port, &self.link) {
            Ok(connection) => connection,
            Err(e) => {
                let error = e.to_string();
                tracing::error!("Failed to open {}: {}", self.port, error);
                self.send_control(BackendMessage::PortUnavailable {
                    port: self.port.system_name.clone(),
                    error: error.clone(),
                });
                self.update_state(AcquisitionState::Closed);
                return self.finish(ExitReason::PortUnavailable(error));
            }
        };

        let mut guard = ConnectionGuard::new(connection);
        self.opened_at = Some(Instant::now());
        self.update_state(AcquisitionState::Reading);

        let reason = self.read_loop(&mut guard);

        self.update_state(AcquisitionState::Closing);
        guard.close();
        tracing::info!("Port {} closed ({})", self.port, reason);
        self.update_state(AcquisitionState::Closed);

        self.finish(reason)
    }

    /// Read until the stream ends, fails, or a stop is requested
    fn read_loop(&mut self, connection: &mut ConnectionGuard) -> ExitReason {
        loop {
            self.process_commands();
            if !self.is_running() {
                return ExitReason::Cancelled;
            }

            let outcome = connection.read_line();

            // A stop that arrived during the read wins over its result
            self.process_commands();
            if !self.is_running() {
                return ExitReason::Cancelled;
            }

            match outcome {
                ReadOutcome::Line(line) => self.handle_line(&line),
                ReadOutcome::Timeout => {
                    self.stats.timeouts += 1;
                    tracing::debug!("No data within {:?}", self.link.read_timeout);
                }
                ReadOutcome::Eof => {
                    tracing::info!("End of stream on {}", self.port);
                    return ExitReason::EndOfStream;
                }
                ReadOutcome::Failed(e) => {
                    let error = e.to_string();
                    tracing::error!("Read error on {}: {}", self.port, error);
                    self.send_control(BackendMessage::ReadError(error.clone()));
                    return ExitReason::ReadFailed(error);
                }
            }

            if self.last_stats_time.elapsed() >= self.stats_interval {
                self.refresh_elapsed();
                self.send_message(BackendMessage::Stats(self.stats.clone()));
                self.last_stats_time = Instant::now();
            }
        }
    }

    /// Parse one line and append it if it is a valid frame
    fn handle_line(&mut self, line: &str) {
        match parse_frame(line) {
            Ok(value) => {
                let sample = Sample::new(self.next_index, value);
                match self.series.append(sample) {
                    Ok(()) => {
                        self.next_index += 1;
                        self.stats.accepted += 1;
                        tracing::trace!("Sample {} = {}", sample.index, sample.value);
                        if self
                            .message_tx
                            .try_send(BackendMessage::Sample(sample))
                            .is_err()
                        {
                            self.stats.dropped_notifications += 1;
                        }
                        self.redraw.request_redraw();
                    }
                    Err(e) => {
                        // Only reachable if something else appended to the series
                        tracing::error!("Dropping sample: {}", e);
                    }
                }
            }
            Err(rejection) if rejection.is_empty() => {
                self.stats.record_rejection(rejection.kind());
                tracing::debug!("Waiting for data...");
            }
            Err(reason) => {
                self.stats.record_rejection(reason.kind());
                tracing::warn!("Dropped malformed frame {:?}: {}", line, reason);
                self.send_message(BackendMessage::FrameRejected {
                    line: line.to_string(),
                    reason,
                });
            }
        }
    }

    /// Process pending commands from the UI
    fn process_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(BackendCommand::Shutdown) => {
                    tracing::info!("Shutdown requested");
                    self.running.store(false, Ordering::SeqCst);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Update state and notify UI
    fn update_state(&mut self, state: AcquisitionState) {
        if self.state != state {
            tracing::debug!("Acquisition state {} -> {}", self.state, state);
        }
        self.state = state;
        self.send_control(BackendMessage::StateChanged(state));
    }

    fn refresh_elapsed(&mut self) {
        if let Some(opened_at) = self.opened_at {
            self.stats.elapsed = opened_at.elapsed();
        }
    }

    /// Send on the data queue without blocking; a full or closed queue drops it
    fn send_message(&self, msg: BackendMessage) {
        if self.message_tx.try_send(msg).is_err() {
            tracing::trace!("UI queue unavailable, message dropped");
        }
    }

    /// Send on the control queue
    ///
    /// A run sends at most seven control messages, fewer than
    /// [`CONTROL_CHANNEL_SIZE`], so this never blocks. It only fails once
    /// the UI has gone away.
    fn send_control(&self, msg: BackendMessage) {
        if self.control_tx.send(msg).is_err() {
            tracing::trace!("UI gone, control message dropped");
        }
    }

    fn finish(mut self, exit_reason: ExitReason) -> AcquisitionSummary {
        self.refresh_elapsed();
        self.send_control(BackendMessage::Stats(self.stats.clone()));
        self.send_control(BackendMessage::Shutdown);
        tracing::info!(
            "Acquisition worker stopped: {} samples, {} rejected",
            self.stats.accepted,
            self.stats.rejected()
        );

        AcquisitionSummary {
            exit_reason,
            final_state: self.state,
            stats: self.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock_serial::{MockEvent, MockTransport, ScriptEnd};
    use crate::backend::NoRedraw;
    use crossbeam_channel::bounded;

    struct Harness {
        worker: AcquisitionWorker,
        series: SharedTimeSeries,
        msg_rx: Receiver<BackendMessage>,
        ctl_rx: Receiver<BackendMessage>,
        cmd_tx: Sender<BackendCommand>,
        running: Arc<AtomicBool>,
    }

    fn create_test_worker(transport: MockTransport) -> Harness {
        create_test_worker_with_queue(transport, 256)
    }

    fn create_test_worker_with_queue(transport: MockTransport, queue: usize) -> Harness {
        let (cmd_tx, cmd_rx) = bounded(16);
        let (msg_tx, msg_rx) = bounded(queue);
        let (ctl_tx, ctl_rx) = bounded(CONTROL_CHANNEL_SIZE);
        let running = Arc::new(AtomicBool::new(true));
        let series = SharedTimeSeries::new();
        let mut config = AppConfig::default();
        config.serial.read_timeout_ms = 20;

        let worker = AcquisitionWorker::new(
            &config,
            PortDescriptor::new("A"),
            Arc::new(transport),
            series.clone(),
            cmd_rx,
            msg_tx,
            ctl_tx,
            running.clone(),
            Arc::new(NoRedraw),
        );

        Harness {
            worker,
            series,
            msg_rx,
            ctl_rx,
            cmd_tx,
            running,
        }
    }

    #[test]
    fn test_worker_creation() {
        let h = create_test_worker(MockTransport::new(["A"]));
        assert_eq!(h.worker.state, AcquisitionState::Opening);
        assert_eq!(h.worker.next_index, 0);
        assert_eq!(h.worker.link.baud_rate, 9600);
    }

    #[test]
    fn test_handle_line_assigns_indices() {
        let mut h = create_test_worker(MockTransport::new(["A"]));

        h.worker.handle_line("1,2,3,9.81");
        h.worker.handle_line("");
        h.worker.handle_line("bad,row");
        h.worker.handle_line("4,5,6,9.79");

        assert_eq!(
            h.series.snapshot(),
            vec![Sample::new(0, 9.81), Sample::new(1, 9.79)]
        );
        assert_eq!(h.worker.stats.accepted, 2);
        assert_eq!(h.worker.stats.empty_lines, 1);
        assert_eq!(h.worker.stats.malformed_shape, 1);
    }

    #[test]
    fn test_rejected_frame_is_reported() {
        let mut h = create_test_worker(MockTransport::new(["A"]));
        h.worker.handle_line("1,2,3,abc");

        let rejected = h
            .msg_rx
            .try_iter()
            .any(|m| matches!(m, BackendMessage::FrameRejected { line, .. } if line == "1,2,3,abc"));
        assert!(rejected);
        assert!(h.series.is_empty());
    }

    #[test]
    fn test_full_queue_counts_dropped_notifications() {
        let mut h = create_test_worker_with_queue(MockTransport::new(["A"]), 1);

        for _ in 0..3 {
            h.worker.handle_line("0,0,0,1.0");
        }

        // Samples still land in the series even when the UI lags
        assert_eq!(h.series.len(), 3);
        assert_eq!(h.worker.stats.dropped_notifications, 2);
    }

    #[test]
    fn test_full_data_queue_keeps_terminal_messages() {
        let transport = MockTransport::new(["A"]).with_events([
            MockEvent::line("0,0,0,1.0"),
            MockEvent::line("0,0,0,2.0"),
            MockEvent::Fail(std::io::ErrorKind::BrokenPipe),
        ]);
        let h = create_test_worker_with_queue(transport, 1);

        let summary = h.worker.run();
        assert_eq!(summary.stats.dropped_notifications, 1);

        let control: Vec<BackendMessage> = h.ctl_rx.try_iter().collect();
        assert!(control
            .iter()
            .any(|m| matches!(m, BackendMessage::ReadError(_))));
        assert!(control
            .iter()
            .any(|m| matches!(m, BackendMessage::StateChanged(AcquisitionState::Closed))));
        assert!(matches!(control.last(), Some(BackendMessage::Shutdown)));
        assert!(h.msg_rx.try_iter().all(|m| matches!(m, BackendMessage::Sample(_))));
    }

    #[test]
    fn test_shutdown_command() {
        let mut h = create_test_worker(MockTransport::new(["A"]));

        h.cmd_tx.send(BackendCommand::Shutdown).unwrap();
        h.worker.process_commands();

        assert!(!h.running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_open_failure_goes_to_closed() {
        let transport = MockTransport::new(["A"]).failing_open();
        let counters = transport.counters();
        let h = create_test_worker(transport);

        let summary = h.worker.run();

        assert!(matches!(summary.exit_reason, ExitReason::PortUnavailable(_)));
        assert_eq!(summary.final_state, AcquisitionState::Closed);
        assert_eq!(counters.reads(), 0);
        assert!(h
            .ctl_rx
            .try_iter()
            .any(|m| matches!(m, BackendMessage::PortUnavailable { .. })));
    }

    #[test]
    fn test_timeouts_do_not_stop_reading() {
        let transport = MockTransport::new(["A"]).with_events([
            MockEvent::Timeout,
            MockEvent::Timeout,
            MockEvent::line("0,0,0,2.5"),
            MockEvent::Eof,
        ]);
        let h = create_test_worker(transport);

        let summary = h.worker.run();

        assert_eq!(summary.exit_reason, ExitReason::EndOfStream);
        assert_eq!(summary.stats.timeouts, 2);
        assert_eq!(h.series.snapshot(), vec![Sample::new(0, 2.5)]);
    }

    #[test]
    fn test_read_error_closes_once() {
        let transport = MockTransport::new(["A"]).with_events([
            MockEvent::line("0,0,0,1.0"),
            MockEvent::Fail(std::io::ErrorKind::BrokenPipe),
            MockEvent::line("0,0,0,2.0"),
        ]);
        let counters = transport.counters();
        let h = create_test_worker(transport);

        let summary = h.worker.run();

        assert!(matches!(summary.exit_reason, ExitReason::ReadFailed(_)));
        assert_eq!(counters.close_calls(), 1);
        assert_eq!(h.series.len(), 1);
    }

    #[test]
    fn test_stopped_before_open_never_opens() {
        let transport = MockTransport::new(["A"]).with_end(ScriptEnd::Idle);
        let counters = transport.counters();
        let h = create_test_worker(transport);
        h.running.store(false, Ordering::SeqCst);

        let summary = h.worker.run();

        assert_eq!(summary.exit_reason, ExitReason::Cancelled);
        assert_eq!(counters.opens(), 0);
        assert_eq!(counters.close_calls(), 0);
    }

    #[test]
    fn test_state_sequence() {
        let transport = MockTransport::new(["A"]).with_lines(["0,0,0,1.0"]);
        let h = create_test_worker(transport);
        h.worker.run();

        let states: Vec<AcquisitionState> = h
            .ctl_rx
            .try_iter()
            .filter_map(|m| match m {
                BackendMessage::StateChanged(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                AcquisitionState::Opening,
                AcquisitionState::Reading,
                AcquisitionState::Closing,
                AcquisitionState::Closed,
            ]
        );
    }
}
