//! Convergence plots rendered with egui.
//!
//! See [`PlotObserver`] and [`Plottable`] for usage.

use eframe::egui;
use egui_plot::{Legend, Line, Plot, PlotPoints, Points};
use ravel_core::Observer;
use ravel_solvers::implicit;

/// Window settings for [`PlotObserver::show`].
///
/// # Example
///
/// ```ignore
/// plot.show(ShowConfig::new().title("Norton").log_y())?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ShowConfig {
    title: Option<String>,
    log_y: bool,
    markers: bool,
}

impl ShowConfig {
    /// No title, linear y-axis, lines only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Plots `log₁₀ y`, skipping non-positive values.
    #[must_use]
    pub fn log_y(mut self) -> Self {
        self.log_y = true;
        self
    }

    /// Draws a marker at every recorded point.
    #[must_use]
    pub fn markers(mut self) -> Self {
        self.markers = true;
        self
    }
}

/// Extracts one `(x, y)` sample from a solver event.
///
/// Returning `None` skips the event.
pub trait Plottable {
    fn sample(&self) -> Option<[f64; 2]>;
}

/// Residual norm against iteration; other events are skipped.
impl<E> Plottable for implicit::Event<'_, E> {
    #[allow(clippy::cast_precision_loss)]
    fn sample(&self) -> Option<[f64; 2]> {
        self.residual_norm()
            .map(|norm| [self.iter() as f64, norm])
    }
}

/// A named series of samples.
#[derive(Debug, Clone)]
struct Trace {
    name: String,
    points: Vec<[f64; 2]>,
}

/// Collects samples from one or more solves and plots them together.
///
/// Each solve writes into the current trace; [`PlotObserver::trace`] starts
/// a new one, so several algorithms can be compared in one window.
///
/// # Example
///
/// ```ignore
/// let mut plot = PlotObserver::new();
/// for algorithm in [Algorithm::NewtonRaphson, Algorithm::Broyden] {
///     let integrator = Integrator::new(Norton::default(), hypothesis, Config::builder(algorithm).build()?)?;
///     plot.trace(algorithm.name());
///     integrator.integrate(&step, &mut plot);
/// }
/// plot.show(ShowConfig::new().log_y().markers())?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct PlotObserver {
    traces: Vec<Trace>,
}

impl PlotObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new trace; later samples go to it.
    pub fn trace(&mut self, name: impl Into<String>) {
        self.traces.push(Trace {
            name: name.into(),
            points: Vec::new(),
        });
    }

    /// Appends a sample to the current trace, starting an unnamed one if
    /// none exists.
    pub fn record(&mut self, x: f64, y: f64) {
        if self.traces.is_empty() {
            self.trace("");
        }
        if let Some(trace) = self.traces.last_mut() {
            trace.points.push([x, y]);
        }
    }

    /// Opens a window with every trace and blocks until it is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the native window cannot be created.
    pub fn show(self, config: ShowConfig) -> Result<(), eframe::Error> {
        let title = config.title.clone().unwrap_or_default();
        eframe::run_native(
            &title,
            eframe::NativeOptions::default(),
            Box::new(move |_cc| {
                Ok(Box::new(PlotApp {
                    traces: self.traces,
                    config,
                }))
            }),
        )
    }
}

impl<E: Plottable, A> Observer<E, A> for PlotObserver {
    fn observe(&mut self, event: &E) -> Option<A> {
        if let Some([x, y]) = event.sample() {
            self.record(x, y);
        }
        None
    }
}

impl<E: Plottable, A> Observer<E, A> for &mut PlotObserver {
    fn observe(&mut self, event: &E) -> Option<A> {
        (**self).observe(event)
    }
}

struct PlotApp {
    traces: Vec<Trace>,
    config: ShowConfig,
}

impl PlotApp {
    fn points(&self, trace: &Trace) -> Vec<[f64; 2]> {
        if self.config.log_y {
            trace
                .points
                .iter()
                .filter(|p| p[1] > 0.0)
                .map(|p| [p[0], p[1].log10()])
                .collect()
        } else {
            trace.points.clone()
        }
    }
}

impl eframe::App for PlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let mut plot = Plot::new("convergence")
                .legend(Legend::default())
                .x_axis_label("iteration");
            if self.config.log_y {
                plot = plot.y_axis_label("log₁₀ residual");
            }
            plot.show(ui, |plot_ui| {
                for trace in &self.traces {
                    let points = self.points(trace);
                    if self.config.markers {
                        plot_ui.points(
                            Points::new(PlotPoints::from(points.clone()))
                                .radius(3.0)
                                .name(&trace.name),
                        );
                    }
                    plot_ui.line(Line::new(PlotPoints::from(points)).name(&trace.name));
                }
            });
        });
    }
}
