use std::{error::Error as StdError, sync::Arc};

use nalgebra::{DMatrix, DVector, DVectorView};
use ravel_core::{Layout, Sensitivities};
use thiserror::Error;

/// The result of one integration attempt.
#[derive(Debug)]
pub enum Outcome {
    Converged(Solution),
    Failed(Failure),
}

impl Outcome {
    #[must_use]
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged(_))
    }

    #[must_use]
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Self::Converged(solution) => Some(solution),
            Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Converged(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    /// Converts into a `Result`, for callers that propagate failures with `?`.
    ///
    /// # Errors
    ///
    /// Returns the [`Failure`] if the attempt did not converge.
    pub fn into_result(self) -> Result<Solution, Failure> {
        match self {
            Self::Converged(solution) => Ok(solution),
            Self::Failed(failure) => Err(failure),
        }
    }
}

/// A converged integration step.
#[derive(Debug, Clone)]
pub struct Solution {
    layout: Arc<Layout>,

    /// Converged normalized unknowns.
    pub unknowns: DVector<f64>,

    /// Converged physical increments of the state variables.
    pub increments: DVector<f64>,

    /// State variables at the end of the step.
    pub end_state: DVector<f64>,

    /// Number of corrections applied before convergence.
    pub iters: usize,

    /// `‖R‖ / N` at the converged point.
    pub residual_norm: f64,

    /// Inverse-Jacobian blocks, when a consistent tangent was requested.
    pub sensitivities: Option<Sensitivities>,

    /// Tangent operator assembled by the behaviour, if it provides one.
    pub tangent_operator: Option<DMatrix<f64>>,
}

impl Solution {
    pub(super) fn new(
        layout: Arc<Layout>,
        unknowns: DVector<f64>,
        scales: &DVector<f64>,
        start_state: &DVector<f64>,
        iters: usize,
        residual_norm: f64,
    ) -> Self {
        let increments = unknowns.component_mul(scales);
        let end_state = start_state + &increments;
        Self {
            layout,
            unknowns,
            increments,
            end_state,
            iters,
            residual_norm,
            sensitivities: None,
            tangent_operator: None,
        }
    }

    /// Physical increment of a state variable.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a state variable.
    #[must_use]
    pub fn increment(&self, name: &str) -> DVectorView<'_, f64> {
        self.layout.view(&self.increments, name)
    }

    /// Value of a state variable at the end of the step.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a state variable.
    #[must_use]
    pub fn state(&self, name: &str) -> DVectorView<'_, f64> {
        self.layout.view(&self.end_state, name)
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}

/// Why an integration attempt failed.
#[derive(Debug, Error)]
pub enum FailureReason {
    #[error("iteration limit reached")]
    MaxIters,

    #[error("singular Jacobian")]
    SingularJacobian,

    #[error("degenerate secant direction")]
    DegenerateSecant,

    #[error("residual is not finite")]
    NonFiniteResidual,

    #[error("behaviour error: {0}")]
    Behaviour(Box<dyn StdError + Send + Sync>),

    #[error("stopped by observer")]
    StoppedByObserver,
}

impl FailureReason {
    pub(super) fn behaviour(error: impl StdError + Send + Sync + 'static) -> Self {
        Self::Behaviour(Box::new(error))
    }
}

/// A failed integration attempt.
///
/// The caller must discard the step, typically by retrying with a smaller
/// time increment.
#[derive(Debug, Error)]
#[error("integration failed after {iters} iterations: {reason}")]
pub struct Failure {
    pub reason: FailureReason,

    /// Number of corrections applied before the failure.
    pub iters: usize,
}
