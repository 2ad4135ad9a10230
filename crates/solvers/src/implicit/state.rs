use nalgebra::{DMatrix, DVector};

use super::acceleration::Accelerator;

/// The point a correction was computed from.
pub(super) struct Previous {
    pub(super) unknowns: DVector<f64>,
    pub(super) residual: DVector<f64>,
}

/// Mutable state of one integration attempt.
///
/// `matrix` holds the Jacobian for Newton and Broyden, or the inverse
/// Jacobian approximation for Broyden2.
pub(super) struct IterationState {
    pub(super) iter: usize,
    pub(super) unknowns: DVector<f64>,
    pub(super) residual: DVector<f64>,
    pub(super) matrix: DMatrix<f64>,
    pub(super) correction: DVector<f64>,
    pub(super) previous: Option<Previous>,
    pub(super) accelerator: Option<Accelerator>,
}

impl IterationState {
    pub(super) fn new(n: usize, accelerator: Option<Accelerator>) -> Self {
        Self {
            iter: 0,
            unknowns: DVector::zeros(n),
            residual: DVector::zeros(n),
            matrix: DMatrix::zeros(n, n),
            correction: DVector::zeros(n),
            previous: None,
            accelerator,
        }
    }

    /// `‖R‖ / N`, or zero for an empty system.
    pub(super) fn residual_norm(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let n = self.residual.len().max(1) as f64;
        self.residual.norm() / n
    }

    /// Remembers the current point as the origin of the next correction.
    pub(super) fn save_previous(&mut self) {
        match &mut self.previous {
            Some(previous) => {
                previous.unknowns.copy_from(&self.unknowns);
                previous.residual.copy_from(&self.residual);
            }
            None => {
                self.previous = Some(Previous {
                    unknowns: self.unknowns.clone(),
                    residual: self.residual.clone(),
                });
            }
        }
    }

    /// Moves the unknowns halfway back toward the previous point.
    ///
    /// Returns `false` if there is no previous point to retreat to.
    pub(super) fn halve_last_update(&mut self) -> bool {
        let Some(previous) = &self.previous else {
            return false;
        };
        self.unknowns += &previous.unknowns;
        self.unknowns *= 0.5;
        true
    }
}
