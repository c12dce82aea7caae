//! Frontend module for egui UI
//!
//! This module provides the live plot window using eframe/egui. It receives
//! samples from the acquisition backend through crossbeam channels and
//! renders them on the UI thread.
//!
//! # Main Types
//!
//! - [`FreefallApp`] - Main application state implementing [`eframe::App`]
//! - [`PlotView`] - Plot configuration and rendering
//! - [`PlotSink`] - UI-owned copy of the plotted points
//!
//! # Submodules
//!
//! - `plot` - Plot rendering with egui_plot
//! - `status_bar` - Bottom bar with state and counters

mod plot;
mod status_bar;

pub use plot::{decimate, y_bounds, PlotSink, PlotView, RenderSink, RepaintHandle};
pub use status_bar::{render_status_bar, state_indicator, StatusBarContext};

use crate::backend::{request_stop, BackendMessage, FrontendReceiver};
use crate::config::AppConfig;
use crate::series::SharedTimeSeries;
use crate::types::{AcquisitionState, AcquisitionStats, PortDescriptor};
use egui::Color32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Window title
pub const WINDOW_TITLE: &str = "Free-fall Acceleration";

/// Main application state for the live plot
pub struct FreefallApp {
    // === Communication ===
    frontend: FrontendReceiver,
    series: SharedTimeSeries,
    stop: Arc<AtomicBool>,

    // === Acquisition state ===
    port: PortDescriptor,
    state: AcquisitionState,
    stats: AcquisitionStats,
    backend_finished: bool,
    last_error: Option<String>,
    last_rejection: Option<String>,

    // === Rendering ===
    sink: PlotSink,
    plot_view: PlotView,
}

impl FreefallApp {
    /// Create the app for a running backend
    pub fn new(
        config: &AppConfig,
        port: PortDescriptor,
        frontend: FrontendReceiver,
        series: SharedTimeSeries,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            frontend,
            series,
            stop,
            port,
            state: AcquisitionState::Opening,
            stats: AcquisitionStats::default(),
            backend_finished: false,
            last_error: None,
            last_rejection: None,
            sink: PlotSink::new(),
            plot_view: PlotView::from_config(&config.ui),
        }
    }

    pub fn sink(&self) -> &PlotSink {
        &self.sink
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    pub fn stats(&self) -> &AcquisitionStats {
        &self.stats
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn backend_finished(&self) -> bool {
        self.backend_finished
    }

    /// Apply pending backend messages to the UI state. Returns true if
    /// anything changed.
    pub fn process_backend_messages(&mut self) -> bool {
        let messages = self.frontend.drain();
        let had_messages = !messages.is_empty();

        for msg in messages {
            self.apply_message(msg);
        }

        let topped_up = self.catch_up();
        had_messages || topped_up
    }

    /// Copy everything the sink is missing from the series
    ///
    /// Notifications may have been dropped under load; the series has every
    /// sample, so this keeps the plot gap-free.
    fn catch_up(&mut self) -> bool {
        let mut appended = false;
        for sample in self.series.since(self.sink.next_index()) {
            appended |= self.sink.append(sample.index, sample.value);
        }
        if appended {
            self.sink.request_redraw();
        }
        appended
    }

    fn apply_message(&mut self, msg: BackendMessage) {
        match msg {
            BackendMessage::Sample(sample) => {
                // Fill any gap left by dropped notifications before this one
                self.catch_up();
                if self.sink.append(sample.index, sample.value) {
                    self.sink.request_redraw();
                }
            }
            BackendMessage::StateChanged(state) => {
                self.state = state;
            }
            BackendMessage::PortUnavailable { port, error } => {
                self.last_error = Some(format!("Could not open {}: {}", port, error));
            }
            BackendMessage::FrameRejected { line, reason } => {
                self.last_rejection = Some(format!("{:?}: {}", line, reason));
            }
            BackendMessage::ReadError(error) => {
                self.last_error = Some(format!("Read error: {}", error));
            }
            BackendMessage::Stats(stats) => {
                self.stats = stats;
            }
            BackendMessage::Shutdown => {
                self.backend_finished = true;
            }
        }
    }

    /// Stop the backend; the worker closes the port at its next read boundary
    pub fn stop_backend(&self) {
        request_stop(&self.stop);
        self.frontend.shutdown();
    }

    fn render_top_panel(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.strong(WINDOW_TITLE);
            ui.separator();
            ui.label(self.port.to_string());

            ui.separator();
            ui.checkbox(&mut self.plot_view.follow_latest, "Follow latest");
            if ui.button("Reset view").clicked() {
                self.plot_view.reset_view();
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let (color, text) = state_indicator(self.state, self.last_error.is_some());
                ui.colored_label(color, text);
                if self.backend_finished && self.last_error.is_none() {
                    ui.colored_label(Color32::GRAY, "Stream ended");
                }
            });
        });
    }
}

impl eframe::App for FreefallApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let had_messages = self.process_backend_messages();
        let redraw = self.sink.take_redraw();

        // Stop requested from outside the window (Ctrl-C)
        if !self.stop.load(Ordering::SeqCst) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        if self.state.is_active() || had_messages || redraw {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            self.render_top_panel(ui);
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            let status = StatusBarContext {
                state: self.state,
                stats: &self.stats,
                port: &self.port.system_name,
                last_error: self.last_error.as_deref(),
                last_rejection: self.last_rejection.as_deref(),
            };
            render_status_bar(ui, &status);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.plot_view.render(ui, &self.sink);
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        tracing::info!("Window closed, stopping acquisition");
        self.stop_backend();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AcquisitionBackend, MockEvent, MockTransport};
    use crate::types::Sample;
    use crossbeam_channel::bounded;

    fn app_for(transport: MockTransport) -> (FreefallApp, AcquisitionBackend) {
        app_with_config(AppConfig::default(), transport)
    }

    fn app_with_config(
        config: AppConfig,
        transport: MockTransport,
    ) -> (FreefallApp, AcquisitionBackend) {
        let port = PortDescriptor::new("A");
        let (backend, frontend) =
            AcquisitionBackend::new(config.clone(), port.clone(), Arc::new(transport));
        let app = FreefallApp::new(
            &config,
            port,
            frontend,
            backend.series(),
            backend.stop_handle(),
        );
        (app, backend)
    }

    #[test]
    fn test_messages_reach_sink() {
        let (mut app, backend) =
            app_for(MockTransport::new(["A"]).with_lines(["1,2,3,9.81", "x", "4,5,6,9.79"]));
        backend.run();

        assert!(app.process_backend_messages());
        assert_eq!(app.sink().points(), &[[0.0, 9.81], [1.0, 9.79]]);
        assert_eq!(app.state(), AcquisitionState::Closed);
        assert!(app.backend_finished());
        assert_eq!(app.stats().accepted, 2);
        assert!(app.last_rejection.is_some());
    }

    #[test]
    fn test_port_unavailable_sets_error() {
        let (mut app, backend) = app_for(MockTransport::new(["A"]).failing_open());
        backend.run();

        app.process_backend_messages();
        assert!(app.last_error().is_some_and(|e| e.contains("A")));
        assert!(app.sink().is_empty());
    }

    #[test]
    fn test_sample_after_dropped_notifications_fills_gap() {
        let series = SharedTimeSeries::new();
        for i in 0..12 {
            series.append(Sample::new(i, i as f64)).unwrap();
        }

        let (msg_tx, msg_rx) = bounded(4);
        let (_ctl_tx, ctl_rx) = bounded(4);
        let (cmd_tx, _cmd_rx) = bounded(4);
        let frontend = FrontendReceiver {
            receiver: msg_rx,
            control: ctl_rx,
            command_sender: cmd_tx,
        };
        let mut app = FreefallApp::new(
            &AppConfig::default(),
            PortDescriptor::new("A"),
            frontend,
            series,
            Arc::new(AtomicBool::new(true)),
        );

        // Notifications 1..=9 were dropped by the worker
        msg_tx.send(BackendMessage::Sample(Sample::new(0, 0.0))).unwrap();
        msg_tx.send(BackendMessage::Sample(Sample::new(10, 10.0))).unwrap();

        assert!(app.process_backend_messages());
        let ticks: Vec<f64> = app.sink().points().iter().map(|p| p[0]).collect();
        let expected: Vec<f64> = (0..12).map(|i| i as f64).collect();
        assert_eq!(ticks, expected);
    }

    #[test]
    fn test_read_error_reaches_ui_with_small_queue() {
        let mut config = AppConfig::default();
        config.collection.channel_buffer_size = 2;
        let transport = MockTransport::new(["A"]).with_events([
            MockEvent::line("0,0,0,9.81"),
            MockEvent::Fail(std::io::ErrorKind::BrokenPipe),
        ]);
        let (mut app, backend) = app_with_config(config, transport);
        backend.run();

        app.process_backend_messages();
        assert_eq!(app.state(), AcquisitionState::Closed);
        assert!(app.last_error().is_some_and(|e| e.contains("Read error")));
        assert!(app.backend_finished());
        assert_eq!(app.sink().points(), &[[0.0, 9.81]]);
    }

    #[test]
    fn test_stop_backend() {
        let (app, backend) = app_for(MockTransport::new(["A"]));
        let stop = backend.stop_handle();
        app.stop_backend();
        assert!(!stop.load(Ordering::SeqCst));
    }
}
