//! Status bar panel showing acquisition state, counters, and the last error.

use egui::{Color32, RichText, Ui};

use crate::types::{AcquisitionState, AcquisitionStats};

/// Context needed to render the status bar.
pub struct StatusBarContext<'a> {
    pub state: AcquisitionState,
    pub stats: &'a AcquisitionStats,
    pub port: &'a str,
    pub last_error: Option<&'a str>,
    pub last_rejection: Option<&'a str>,
}

/// Indicator color and label for a state
pub fn state_indicator(state: AcquisitionState, failed: bool) -> (Color32, &'static str) {
    match state {
        _ if failed => (Color32::RED, "Error"),
        AcquisitionState::Opening => (Color32::YELLOW, "Opening"),
        AcquisitionState::Reading => (Color32::GREEN, "Reading"),
        AcquisitionState::Closing => (Color32::YELLOW, "Closing"),
        AcquisitionState::Closed => (Color32::GRAY, "Closed"),
    }
}

/// Render the status bar.
pub fn render_status_bar(ui: &mut Ui, ctx: &StatusBarContext<'_>) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        let (status_color, status_text) = state_indicator(ctx.state, ctx.last_error.is_some());
        ui.colored_label(status_color, "●");
        ui.label(RichText::new(format!("{}: {}", status_text, ctx.port)).small());

        ui.separator();

        let stats = ctx.stats;

        let rate = stats.sample_rate();
        let rate_color = if rate > 0.0 {
            Color32::from_rgb(100, 255, 100)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new("Rate:").small());
        ui.colored_label(rate_color, RichText::new(format!("{:.1} Hz", rate)).small());

        ui.separator();

        ui.label(RichText::new(format!("Samples: {}", stats.accepted)).small());

        ui.separator();

        let rejected = stats.rejected();
        let rejected_color = if rejected > 0 {
            Color32::LIGHT_RED
        } else {
            Color32::GRAY
        };
        let rejected_label = ui.colored_label(
            rejected_color,
            RichText::new(format!("Rejected: {}", rejected)).small(),
        );
        if let Some(rejection) = ctx.last_rejection {
            rejected_label.on_hover_text(rejection);
        }

        ui.separator();

        ui.label(RichText::new(format!("Timeouts: {}", stats.timeouts)).small());

        if let Some(error) = ctx.last_error {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.colored_label(Color32::RED, RichText::new(error).small());
            });
        }
    });
}
