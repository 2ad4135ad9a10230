//! Convergence of the implicit solvers on a Norton creep step.
//!
//! # Usage
//!
//! ```text
//! cargo run --example plot --features plot
//! cargo run --example plot --features plot -- 5e-3
//! ```
//!
//! The optional argument is the axial strain increment (default `2e-3`).
//! Larger increments drive more viscoplastic flow; Newton keeps its
//! quadratic tail while the Broyden variants need more iterations and
//! Levenberg-Marquardt starts cautiously.

use std::error::Error;

use ravel_behaviours::Norton;
use ravel_core::Hypothesis;
use ravel_observers::{PlotObserver, ShowConfig};
use ravel_solvers::implicit::{Algorithm, Config, Integrator};

fn main() -> Result<(), Box<dyn Error>> {
    let strain = std::env::args()
        .nth(1)
        .as_deref()
        .map(str::parse::<f64>)
        .transpose()
        .unwrap_or_else(|_| {
            eprintln!("Invalid strain increment, expected a number such as 2e-3");
            std::process::exit(1);
        })
        .unwrap_or(2e-3);

    let mut plot = PlotObserver::new();

    for algorithm in [
        Algorithm::NewtonRaphson,
        Algorithm::NewtonRaphsonNumericalJacobian,
        Algorithm::Broyden,
        Algorithm::Broyden2,
        Algorithm::LevenbergMarquardt,
    ] {
        let config = Config::builder(algorithm)
            .epsilon(1e-14)
            .max_iters(200)
            .build()?;
        let integrator = Integrator::new(Norton::default(), Hypothesis::Tridimensional, config)?;

        let mut step = integrator.step().with_time_increment(10.0);
        step.set_driving_increment("eto", &[strain, -strain / 2.0, -strain / 2.0, 0.0, 0.0, 0.0]);

        plot.trace(algorithm.name());
        match integrator.integrate(&step, &mut plot).into_result() {
            Ok(solution) => println!(
                "{:<36} {:>3} iterations, Δp = {:.4e}",
                algorithm.name(),
                solution.iters,
                solution.increment("p")[0]
            ),
            Err(failure) => println!("{:<36} {failure}", algorithm.name()),
        }
    }

    plot.show(
        ShowConfig::new()
            .title(format!("Norton creep, Δε = {strain:e}: residual norm per iteration"))
            .log_y()
            .markers(),
    )?;

    Ok(())
}
