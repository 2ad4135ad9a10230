//! Implicit integration of a material behaviour over one time step.
//!
//! # Algorithm
//!
//! The unknowns are the normalized increments `z` of the state variables over
//! the step, starting from zero. Each iteration evaluates the behaviour's
//! residual `R(z)` at the implicit point `start + θ·f·z`, stops when
//! `‖R‖ / N < epsilon`, and otherwise computes a correction:
//!
//! - [`Algorithm::NewtonRaphson`] solves `J·δ = −R` with the behaviour's
//!   analytic Jacobian, optionally cross-checked against finite differences
//! - [`Algorithm::NewtonRaphsonNumericalJacobian`] uses a central-difference
//!   Jacobian, refreshed every `jacobian_update_period` iterations
//! - [`Algorithm::Broyden`] and [`Algorithm::Broyden2`] start from an initial
//!   Jacobian and apply rank-one secant updates to it or to its inverse
//! - [`Algorithm::LevenbergMarquardt`] and its numerical variant damp the
//!   Gauss-Newton step and accept a trial point only if the residual drops
//!
//! The correction is clamped by the configured increment limits and added to
//! the unknowns. Optional Cast3M acceleration, relaxation and physical bounds
//! are applied before the next evaluation.
//!
//! At convergence, if the step requests a consistent tangent, columns of the
//! inverse Jacobian are extracted as [`Sensitivities`] and handed to
//! [`Behaviour::tangent_operator`].
//!
//! # When to Use
//!
//! - Newton-Raphson when the behaviour provides an exact Jacobian
//! - the numerical variant while developing a behaviour, or when the
//!   Jacobian is too tedious to derive
//! - Broyden variants when the Jacobian is expensive and a reasonable
//!   initial guess for it exists
//! - Levenberg-Marquardt when Newton steps overshoot from the elastic
//!   prediction
//!
//! # Limitations
//!
//! - **Local**: convergence is only expected from a good starting point;
//!   callers retry failed steps with a smaller time increment
//! - **Dense**: Jacobians are stored and factored as dense matrices
//!
//! # Observer Events
//!
//! - [`Event::Evaluated`] after each successful evaluation
//! - [`Event::BehaviourFailed`] and [`Event::NonFiniteResidual`] when an
//!   evaluation is rejected; after the first iteration the last update is
//!   halved and the iteration counts as spent
//! - [`Event::JacobianMismatch`] when comparison mode finds analytic blocks
//!   that disagree with finite differences
//! - [`Event::Accelerated`] when the extrapolation replaces the unknowns
//!
//! Returning [`Action::StopEarly`] from any event abandons the attempt.
//!
//! [`Sensitivities`]: ravel_core::Sensitivities

mod acceleration;
mod action;
mod config;
mod error;
mod evaluate;
mod event;
mod iterate;
mod levenberg_marquardt;
mod limiter;
mod numerical;
mod relaxation;
mod secant;
mod solution;
mod state;
mod tangent;

#[cfg(test)]
mod tests;

pub use action::Action;
pub use config::{
    Acceleration, Algorithm, BroydenSeed, Config, ConfigBuilder, ConfigError, IncrementLimits,
    LevenbergMarquardt, MissingDiagonal, Relaxation, TangentJacobian,
};
pub use error::Error;
pub use event::Event;
pub use numerical::JacobianMismatch;
pub use solution::{Failure, FailureReason, Outcome, Solution};

use std::sync::Arc;

use nalgebra::DVector;
use ravel_core::{Behaviour, Hypothesis, Layout, Observer, StateVariable, Step};

use limiter::Limiter;

/// Integrates a behaviour with a fixed configuration.
///
/// Layouts and scale factors are resolved once in [`Integrator::new`];
/// [`Integrator::integrate`] takes `&self` and can be called for many steps
/// and material points.
#[derive(Debug)]
pub struct Integrator<B> {
    behaviour: B,
    config: Config,
    layout: Arc<Layout>,
    driving_layout: Arc<Layout>,
    scales: DVector<f64>,
    limiter: Limiter,
}

impl<B: Behaviour> Integrator<B> {
    /// Resolves the behaviour's variables under `hypothesis`.
    ///
    /// # Errors
    ///
    /// Returns an error if the variables are invalid, or if the config names
    /// a state variable the behaviour does not declare.
    pub fn new(behaviour: B, hypothesis: Hypothesis, config: Config) -> Result<Self, Error> {
        let state_variables = behaviour.state_variables();
        let layout = Layout::for_state(hypothesis, &state_variables)?;
        let driving_variables = behaviour.driving_variables();
        let driving_layout = Layout::new(hypothesis, &driving_variables)?;

        let known = |name: &str, context| {
            if layout.contains(name) {
                Ok(())
            } else {
                Err(Error::UnknownVariable {
                    name: name.to_owned(),
                    context,
                })
            }
        };
        for name in config.increment_limits().variables.keys() {
            known(name, "increment limits")?;
        }
        for name in config.sensitivities() {
            known(name, "sensitivities")?;
        }

        let scales = scale_factors(&layout, &state_variables);
        let limiter = Limiter::new(&layout, &state_variables, config.increment_limits());

        log::debug!(
            "integrator ready: {} with {} unknowns",
            config.algorithm(),
            layout.len()
        );

        Ok(Self {
            behaviour,
            config,
            layout: Arc::new(layout),
            driving_layout: Arc::new(driving_layout),
            scales,
            limiter,
        })
    }

    /// Creates an empty step matching this integrator's layouts.
    #[must_use]
    pub fn step(&self) -> Step {
        Step::new(Arc::clone(&self.layout), Arc::clone(&self.driving_layout))
    }

    /// Layout of the unknowns.
    #[must_use]
    pub fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    #[must_use]
    pub fn driving_layout(&self) -> &Arc<Layout> {
        &self.driving_layout
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn behaviour(&self) -> &B {
        &self.behaviour
    }

    /// Integrates one step.
    ///
    /// The observer receives an [`Event`] at each stage of the loop.
    /// See the [module docs](self) for details.
    ///
    /// # Panics
    ///
    /// Panics if `step` was not built for this integrator's layouts.
    pub fn integrate<Obs>(&self, step: &Step, mut observer: Obs) -> Outcome
    where
        Obs: for<'a> Observer<Event<'a, B::Error>, Action>,
    {
        assert!(
            **step.state_layout() == *self.layout && **step.driving_layout() == *self.driving_layout,
            "step layouts do not match the integrator"
        );

        if self.config.algorithm().is_levenberg_marquardt() {
            levenberg_marquardt::iterate(self, step, &mut observer)
        } else {
            iterate::iterate(self, step, &mut observer)
        }
    }

    /// Integrates one step without observer support.
    ///
    /// This is a convenience wrapper around [`Integrator::integrate`] that
    /// uses a no-op observer.
    ///
    /// # Panics
    ///
    /// Panics if `step` was not built for this integrator's layouts.
    pub fn integrate_unobserved(&self, step: &Step) -> Outcome {
        self.integrate(step, ())
    }
}

/// Per-component normalization factors, in layout order.
fn scale_factors(layout: &Layout, variables: &[StateVariable]) -> DVector<f64> {
    let mut scales = DVector::from_element(layout.len(), 1.0);
    for variable in variables {
        layout
            .view_mut(&mut scales, variable.name())
            .fill(variable.normalization());
    }
    scales
}
