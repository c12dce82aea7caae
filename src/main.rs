//! freefall-plot - Main Entry Point
//!
//! Lists the serial ports, asks which one the sensor is on, then plots the
//! acceleration it reports until the window is closed.

use anyhow::{anyhow, Context};
use freefall_plot::{
    backend::{request_stop, AcquisitionBackend, SerialPortTransport, SerialTransport},
    config::AppConfig,
    error::FreefallError,
    frontend::{FreefallApp, RepaintHandle, WINDOW_TITLE},
    logging,
    selector::{self, Chooser, FixedChooser, PromptChooser, SelectionPolicy},
};
use std::io::{self, Write};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_or_default().validated();
    let _log_guard = logging::init(&config.logging);

    tracing::info!("Starting freefall-plot");

    let transport: Arc<dyn SerialTransport> = Arc::new(SerialPortTransport::new());

    // Pick the port on the main thread before any window exists
    let ports = selector::enumerate(transport.as_ref())?;
    if !ports.is_empty() {
        let mut stderr = io::stderr();
        write!(stderr, "{}", selector::describe_ports(&ports))?;
    }

    let policy = SelectionPolicy::from(&config.selection);
    let fixed = config.serial.port_name.as_deref().and_then(|name| {
        let chooser = FixedChooser::resolve(name, &ports);
        if chooser.is_none() {
            tracing::warn!("Configured port {} not present, asking instead", name);
        }
        chooser
    });
    let mut chooser: Box<dyn Chooser> = match fixed {
        Some(chooser) => Box::new(chooser),
        None => Box::new(PromptChooser::new(io::stdin().lock(), io::stderr())),
    };

    let port = match selector::select(&ports, chooser.as_mut(), &policy) {
        Ok(port) => port,
        Err(FreefallError::SelectionCancelled) => {
            tracing::info!("No port selected, exiting");
            return Ok(());
        }
        Err(e) => {
            if e.is_operator_facing() {
                tracing::error!("{}", e);
            }
            return Err(e.into());
        }
    };
    drop(chooser);

    // Start acquisition
    let repaint = RepaintHandle::new();
    let (backend, frontend) = AcquisitionBackend::new(config.clone(), port.clone(), transport);
    let backend = backend.with_redraw(Arc::new(repaint.clone()));
    let series = backend.series();
    let stop = backend.stop_handle();

    let signal_stop = stop.clone();
    let signal_repaint = repaint.clone();
    ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal");
        request_stop(&signal_stop);
        signal_repaint.close_window();
    })
    .context("Error setting Ctrl-C handler")?;

    let handle = backend
        .spawn()
        .context("Failed to spawn acquisition thread")?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.ui.window_size)
            .with_min_inner_size([400.0, 300.0])
            .with_title(WINDOW_TITLE),
        ..Default::default()
    };

    let app_stop = stop.clone();
    let result = eframe::run_native(
        WINDOW_TITLE,
        native_options,
        Box::new(move |cc| {
            if config.ui.dark_mode {
                cc.egui_ctx.set_visuals(egui::Visuals::dark());
            } else {
                cc.egui_ctx.set_visuals(egui::Visuals::light());
            }
            repaint.bind(cc.egui_ctx.clone());

            Ok(Box::new(FreefallApp::new(
                &config, port, frontend, series, app_stop,
            )))
        }),
    );

    // Signal backend to stop and wait for it to close the port
    tracing::info!("Shutting down...");
    request_stop(&stop);
    let summary = handle
        .join()
        .map_err(|_| anyhow!("Acquisition thread panicked"))?;

    tracing::info!(
        "Acquisition ended ({}) after {} samples",
        summary.exit_reason,
        summary.stats.accepted
    );

    result.map_err(|e| anyhow!("{}", e))?;

    if summary.exit_reason.is_failure() {
        return Err(anyhow!("Acquisition failed: {}", summary.exit_reason));
    }
    Ok(())
}
