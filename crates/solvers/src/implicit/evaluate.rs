use nalgebra::{DMatrix, DVector};
use ravel_core::{Behaviour, JacobianBlocks, Layout, Point, Step, System};

use super::{FailureReason, MissingDiagonal};

/// Why an evaluation could not produce a usable residual.
#[derive(Debug)]
pub(super) enum EvalError<E> {
    Behaviour(E),
    NonFinite,
}

impl<E: std::error::Error + Send + Sync + 'static> EvalError<E> {
    pub(super) fn into_reason(self) -> FailureReason {
        match self {
            Self::Behaviour(error) => FailureReason::behaviour(error),
            Self::NonFinite => FailureReason::NonFiniteResidual,
        }
    }
}

/// Evaluates a behaviour on normalized unknowns.
///
/// The behaviour sees physical increments `f·z` and writes physical
/// equations; the evaluator returns them in solver units, dividing residual
/// rows by `f_y` and scaling Jacobian blocks by `f_k / f_y`.
pub(super) struct Evaluator<'a, B> {
    behaviour: &'a B,
    layout: &'a Layout,
    scales: &'a DVector<f64>,
    step: &'a Step,
    theta: f64,
    missing_diagonal: MissingDiagonal,
    increments: DVector<f64>,
    provided: Vec<bool>,
}

impl<'a, B: Behaviour> Evaluator<'a, B> {
    pub(super) fn new(
        behaviour: &'a B,
        layout: &'a Layout,
        scales: &'a DVector<f64>,
        step: &'a Step,
        theta: f64,
        missing_diagonal: MissingDiagonal,
    ) -> Self {
        Self {
            behaviour,
            layout,
            scales,
            step,
            theta,
            missing_diagonal,
            increments: DVector::zeros(layout.len()),
            provided: vec![false; layout.slots().len()],
        }
    }

    pub(super) fn len(&self) -> usize {
        self.layout.len()
    }

    /// Writes the residual at `unknowns`.
    pub(super) fn residual(
        &mut self,
        unknowns: &DVector<f64>,
        residual: &mut DVector<f64>,
    ) -> Result<(), EvalError<B::Error>> {
        self.set_increments(unknowns);
        residual.fill(0.0);

        let point = Point::new(self.step, self.theta, &self.increments);
        let mut system = System::new(self.layout, residual, None);
        self.behaviour
            .residual(&point, &mut system)
            .map_err(EvalError::Behaviour)?;

        self.normalize_residual(residual)
    }

    /// Writes the residual and the analytic Jacobian at `unknowns`.
    ///
    /// Diagonal blocks the behaviour leaves untouched are filled according
    /// to the missing-diagonal policy; other blocks stay zero.
    pub(super) fn residual_and_jacobian(
        &mut self,
        unknowns: &DVector<f64>,
        residual: &mut DVector<f64>,
        jacobian: &mut DMatrix<f64>,
    ) -> Result<(), EvalError<B::Error>> {
        self.set_increments(unknowns);
        residual.fill(0.0);
        jacobian.fill(0.0);
        self.provided.fill(false);

        let point = Point::new(self.step, self.theta, &self.increments);
        let blocks = JacobianBlocks::new(self.layout, jacobian, &mut self.provided);
        let mut system = System::new(self.layout, residual, Some(blocks));
        self.behaviour
            .residual(&point, &mut system)
            .map_err(EvalError::Behaviour)?;

        self.fill_missing_diagonals(jacobian);
        self.normalize_jacobian(jacobian);
        self.normalize_residual(residual)
    }

    /// Writes the starting Jacobian of a quasi-Newton solver.
    ///
    /// The identity is handed to the behaviour, which may overwrite blocks.
    pub(super) fn initial_jacobian(
        &mut self,
        unknowns: &DVector<f64>,
        jacobian: &mut DMatrix<f64>,
    ) -> Result<(), B::Error> {
        self.set_increments(unknowns);
        jacobian.fill_with_identity();
        self.provided.fill(false);

        let point = Point::new(self.step, self.theta, &self.increments);
        let mut blocks = JacobianBlocks::new(self.layout, jacobian, &mut self.provided);
        self.behaviour.initial_jacobian(&point, &mut blocks)?;

        self.normalize_jacobian(jacobian);
        Ok(())
    }

    /// Runs `f` with the point matching `unknowns`.
    pub(super) fn with_point<T>(
        &mut self,
        unknowns: &DVector<f64>,
        f: impl FnOnce(&B, &Point<'_>) -> T,
    ) -> T {
        self.set_increments(unknowns);
        let point = Point::new(self.step, self.theta, &self.increments);
        f(self.behaviour, &point)
    }

    fn set_increments(&mut self, unknowns: &DVector<f64>) {
        self.increments.copy_from(unknowns);
        self.increments.component_mul_assign(self.scales);
    }

    fn fill_missing_diagonals(&self, jacobian: &mut DMatrix<f64>) {
        if self.missing_diagonal == MissingDiagonal::Zero {
            return;
        }
        for (slot, provided) in self.layout.slots().iter().zip(&self.provided) {
            if !provided {
                let range = slot.range();
                jacobian
                    .view_mut((range.start, range.start), (range.len(), range.len()))
                    .fill_with_identity();
            }
        }
    }

    fn normalize_residual(&self, residual: &mut DVector<f64>) -> Result<(), EvalError<B::Error>> {
        residual.component_div_assign(self.scales);
        if residual.iter().all(|r| r.is_finite()) {
            Ok(())
        } else {
            Err(EvalError::NonFinite)
        }
    }

    fn normalize_jacobian(&self, jacobian: &mut DMatrix<f64>) {
        let n = self.len();
        for j in 0..n {
            for i in 0..n {
                jacobian[(i, j)] *= self.scales[j] / self.scales[i];
            }
        }
    }
}
