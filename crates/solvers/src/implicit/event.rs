use nalgebra::DVector;

use super::JacobianMismatch;

/// Events emitted by the implicit solver.
///
/// `iter` is the number of corrections applied so far, so the first
/// evaluation of an attempt reports `iter == 0`.
#[derive(Debug)]
pub enum Event<'a, E> {
    /// The residual was evaluated at the current unknowns.
    Evaluated {
        iter: usize,

        /// Normalized unknowns at the evaluated point.
        unknowns: &'a DVector<f64>,

        /// Normalized residual at the evaluated point.
        residual: &'a DVector<f64>,

        /// `‖residual‖ / N`, the quantity compared to `epsilon`.
        residual_norm: f64,
    },

    /// The behaviour rejected the current unknowns.
    BehaviourFailed {
        iter: usize,
        unknowns: &'a DVector<f64>,
        error: &'a E,
    },

    /// The residual was not finite at the current unknowns.
    NonFiniteResidual {
        iter: usize,
        unknowns: &'a DVector<f64>,
    },

    /// Analytic Jacobian blocks disagree with their numerical estimate.
    JacobianMismatch {
        iter: usize,
        mismatches: &'a [JacobianMismatch],
    },

    /// The Cast3M extrapolation replaced the unknowns.
    Accelerated {
        iter: usize,
        unknowns: &'a DVector<f64>,
    },
}

impl<E> Event<'_, E> {
    #[must_use]
    pub fn iter(&self) -> usize {
        match self {
            Self::Evaluated { iter, .. }
            | Self::BehaviourFailed { iter, .. }
            | Self::NonFiniteResidual { iter, .. }
            | Self::JacobianMismatch { iter, .. }
            | Self::Accelerated { iter, .. } => *iter,
        }
    }

    /// Returns the residual norm for [`Event::Evaluated`].
    #[must_use]
    pub fn residual_norm(&self) -> Option<f64> {
        match self {
            Self::Evaluated { residual_norm, .. } => Some(*residual_norm),
            _ => None,
        }
    }

    /// Returns the unknowns the event refers to, if any.
    #[must_use]
    pub fn unknowns(&self) -> Option<&DVector<f64>> {
        match self {
            Self::Evaluated { unknowns, .. }
            | Self::BehaviourFailed { unknowns, .. }
            | Self::NonFiniteResidual { unknowns, .. }
            | Self::Accelerated { unknowns, .. } => Some(unknowns),
            Self::JacobianMismatch { .. } => None,
        }
    }
}
