//! Plot rendering module using egui_plot
//!
//! # Main Types
//!
//! - [`RenderSink`] - Where accepted samples are delivered on the UI thread
//! - [`PlotSink`] - The sink backing the live plot
//! - [`PlotView`] - Plot configuration and rendering state
//! - [`RepaintHandle`] - Cross-thread redraw trigger bound to the egui context

use crate::backend::RedrawSignal;
use crate::config::UiConfig;
use crate::types::MAX_RENDER_POINTS;
use egui::Ui;
use egui_plot::{Corner, Legend, Line, Plot, PlotBounds, PlotPoints};
use std::sync::{Arc, OnceLock};

/// Consumer of `(index, value)` pairs on the UI thread
pub trait RenderSink {
    /// Add a point. Returns false if `index` is not newer than the last one.
    fn append(&mut self, index: u64, value: f64) -> bool;

    /// Ask for the plot to be redrawn on the next frame
    fn request_redraw(&mut self);
}

/// Points shown by the live plot
#[derive(Debug, Clone, Default)]
pub struct PlotSink {
    points: Vec<[f64; 2]>,
    last_index: Option<u64>,
    redraw_requested: bool,
}

impl PlotSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the sink expects next
    pub fn next_index(&self) -> u64 {
        self.last_index.map_or(0, |i| i + 1)
    }

    pub fn last_index(&self) -> Option<u64> {
        self.last_index
    }

    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Clear and return the pending redraw request
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    /// Points with `x` in `[x_min, x_max]`, decimated to at most `max_points`
    pub fn visible_points(&self, x_min: f64, x_max: f64, max_points: usize) -> Vec<[f64; 2]> {
        let start = self.points.partition_point(|p| p[0] < x_min);
        let end = self.points.partition_point(|p| p[0] <= x_max);
        decimate(&self.points[start..end], max_points)
    }
}

impl RenderSink for PlotSink {
    fn append(&mut self, index: u64, value: f64) -> bool {
        if self.last_index.is_some_and(|last| index <= last) {
            tracing::trace!("Ignoring stale sample {}", index);
            return false;
        }
        self.points.push([index as f64, value]);
        self.last_index = Some(index);
        true
    }

    fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }
}

/// Keep every n-th point so that at most `max_points` remain; the last point
/// is always kept.
pub fn decimate(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points || max_points < 2 {
        return points.to_vec();
    }

    let stride = points.len().div_ceil(max_points - 1);
    let mut out: Vec<[f64; 2]> = points.iter().step_by(stride).copied().collect();
    if let (Some(last), Some(kept)) = (points.last(), out.last()) {
        if last != kept {
            out.push(*last);
        }
    }
    out
}

/// Y bounds of `points` with a small margin, not forced to include zero
pub fn y_bounds(points: &[[f64; 2]]) -> Option<(f64, f64)> {
    let (min, max) = points
        .iter()
        .map(|p| p[1])
        .filter(|y| y.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, y| match acc {
            None => Some((y, y)),
            Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
        })?;

    let span = max - min;
    let margin = if span > f64::EPSILON {
        span * 0.05
    } else {
        // Flat signal; give it some room around the value
        (max.abs() * 0.05).max(0.1)
    };
    Some((min - margin, max + margin))
}

/// Plot view configuration and state
#[derive(Debug, Clone)]
pub struct PlotView {
    /// Whether to show the legend
    pub show_legend: bool,
    /// Whether to show grid lines
    pub show_grid: bool,
    /// Line width
    pub line_width: f32,
    /// Whether to follow the latest data
    pub follow_latest: bool,
    /// Ticks visible while following
    pub visible_ticks: u64,
    /// Whether the plot is currently being dragged
    pub is_dragging: bool,
}

impl Default for PlotView {
    fn default() -> Self {
        Self {
            show_legend: true,
            show_grid: true,
            line_width: 1.5,
            follow_latest: true,
            visible_ticks: 500,
            is_dragging: false,
        }
    }
}

impl PlotView {
    /// Create a new PlotView from UI configuration
    pub fn from_config(config: &UiConfig) -> Self {
        Self {
            show_legend: config.show_legend,
            show_grid: config.show_grid,
            line_width: config.line_width,
            follow_latest: config.follow_latest,
            visible_ticks: config.visible_ticks.max(1),
            ..Default::default()
        }
    }

    /// X range shown while following the latest sample
    pub fn follow_window(&self, last_index: Option<u64>) -> (f64, f64) {
        let x_max = last_index.unwrap_or(0) as f64;
        let x_min = (x_max - self.visible_ticks as f64).max(0.0);
        (x_min, x_max.max(x_min + 1.0))
    }

    /// Render the acceleration plot
    pub fn render(&mut self, ui: &mut Ui, sink: &PlotSink) {
        let following = self.follow_latest;

        let mut plot = Plot::new("acceleration_plot")
            .allow_drag(!following)
            .show_axes(true)
            .show_grid(self.show_grid)
            .x_axis_label("Tick")
            .y_axis_label("Acceleration");

        if self.show_legend {
            plot = plot.legend(
                Legend::default()
                    .position(Corner::RightTop)
                    .background_alpha(0.8),
            );
        }

        // Autoscale Y from the data only, so zero is not always in view
        plot = plot.auto_bounds([!following, true]);

        let points = if following {
            let (x_min, x_max) = self.follow_window(sink.last_index());
            sink.visible_points(x_min, x_max, MAX_RENDER_POINTS)
        } else {
            decimate(sink.points(), MAX_RENDER_POINTS)
        };

        let line_width = self.line_width;
        let window = self.follow_window(sink.last_index());
        let bounds = y_bounds(&points);

        let response = plot.show(ui, |plot_ui| {
            if following {
                let (x_min, x_max) = window;
                let (y_min, y_max) = bounds.unwrap_or((-1.0, 1.0));
                plot_ui.set_plot_bounds(PlotBounds::from_min_max([x_min, y_min], [x_max, y_max]));
            }

            if !points.is_empty() {
                let line = Line::new("Acceleration", PlotPoints::from(points))
                    .width(line_width);
                plot_ui.line(line);
            }
        });

        if response.response.dragged() {
            self.is_dragging = true;
            self.follow_latest = false;
        }
        if response.response.drag_stopped() {
            self.is_dragging = false;
        }
    }

    /// Reset the view to follow latest data
    pub fn reset_view(&mut self) {
        self.follow_latest = true;
        self.is_dragging = false;
    }
}

/// [`RedrawSignal`] that wakes the egui event loop
///
/// Created before the window exists; [`RepaintHandle::bind`] attaches the
/// context once eframe hands it over. Signals before that are dropped.
#[derive(Debug, Clone, Default)]
pub struct RepaintHandle {
    ctx: Arc<OnceLock<egui::Context>>,
}

impl RepaintHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the egui context. Later calls have no effect.
    pub fn bind(&self, ctx: egui::Context) {
        if self.ctx.set(ctx).is_err() {
            tracing::debug!("Repaint handle already bound");
        }
    }

    /// Ask the window to close, as if the user had closed it
    pub fn close_window(&self) {
        if let Some(ctx) = self.ctx.get() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            ctx.request_repaint();
        }
    }
}

impl RedrawSignal for RepaintHandle {
    fn request_redraw(&self) {
        if let Some(ctx) = self.ctx.get() {
            ctx.request_repaint();
        }
    }
}
