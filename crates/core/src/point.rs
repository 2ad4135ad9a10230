use nalgebra::{DMatrix, DMatrixView, DMatrixViewMut, DVector, DVectorView, DVectorViewMut};

use crate::{Hypothesis, Layout, Step, StiffnessRequest};

/// The values a behaviour sees while its residual is evaluated.
///
/// Increments are physical: normalization factors have already been applied
/// to the unknowns. Intermediate values use the implicit mixing rule
/// `start + θ·increment`; end-of-step values use the full increment.
#[derive(Debug, Clone, Copy)]
pub struct Point<'a> {
    step: &'a Step,
    theta: f64,
    increments: &'a DVector<f64>,
}

impl<'a> Point<'a> {
    /// Creates an evaluation point.
    ///
    /// # Panics
    ///
    /// Panics if `increments` does not match the state layout of `step`.
    #[must_use]
    pub fn new(step: &'a Step, theta: f64, increments: &'a DVector<f64>) -> Self {
        assert_eq!(
            increments.len(),
            step.state_layout().len(),
            "increments do not match the state layout"
        );
        Self {
            step,
            theta,
            increments,
        }
    }

    #[must_use]
    pub fn theta(&self) -> f64 {
        self.theta
    }

    #[must_use]
    pub fn time_increment(&self) -> f64 {
        self.step.time_increment()
    }

    #[must_use]
    pub fn hypothesis(&self) -> Hypothesis {
        self.step.state_layout().hypothesis()
    }

    #[must_use]
    pub fn stiffness(&self) -> StiffnessRequest {
        self.step.stiffness()
    }

    #[must_use]
    pub fn step(&self) -> &'a Step {
        self.step
    }

    /// All physical increments, in layout order.
    #[must_use]
    pub fn increments(&self) -> &'a DVector<f64> {
        self.increments
    }

    /// Physical increment of a state variable.
    #[must_use]
    pub fn increment(&self, name: &str) -> DVectorView<'a, f64> {
        self.step.state_layout().view(self.increments, name)
    }

    /// Value of a state variable at the start of the step.
    #[must_use]
    pub fn start(&self, name: &str) -> DVectorView<'a, f64> {
        self.step.state_layout().view(self.step.state(), name)
    }

    /// Value of a state variable at `t + θ·Δt`.
    #[must_use]
    pub fn mid(&self, name: &str) -> DVector<f64> {
        self.start(name) + self.increment(name) * self.theta
    }

    /// Value of a state variable at the end of the step.
    #[must_use]
    pub fn end(&self, name: &str) -> DVector<f64> {
        self.start(name) + self.increment(name)
    }

    #[must_use]
    pub fn driving_start(&self, name: &str) -> DVectorView<'a, f64> {
        self.step.driving_layout().view(self.step.driving(), name)
    }

    #[must_use]
    pub fn driving_increment(&self, name: &str) -> DVectorView<'a, f64> {
        self.step
            .driving_layout()
            .view(self.step.driving_increment(), name)
    }

    /// Value of a driving variable at `t + θ·Δt`.
    #[must_use]
    pub fn driving_mid(&self, name: &str) -> DVector<f64> {
        self.driving_start(name) + self.driving_increment(name) * self.theta
    }

    #[must_use]
    pub fn driving_end(&self, name: &str) -> DVector<f64> {
        self.driving_start(name) + self.driving_increment(name)
    }
}

/// The residual and, when requested, the Jacobian a behaviour fills in.
///
/// Both are written in physical units and addressed by variable name.
/// Buffers are zeroed before every evaluation.
pub struct System<'a> {
    layout: &'a Layout,
    residual: &'a mut DVector<f64>,
    jacobian: Option<JacobianBlocks<'a>>,
}

impl<'a> System<'a> {
    #[must_use]
    pub fn new(
        layout: &'a Layout,
        residual: &'a mut DVector<f64>,
        jacobian: Option<JacobianBlocks<'a>>,
    ) -> Self {
        Self {
            layout,
            residual,
            jacobian,
        }
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        self.layout
    }

    /// The residual equations of a state variable.
    pub fn residual_mut(&mut self, name: &str) -> DVectorViewMut<'_, f64> {
        self.layout.view_mut(&mut *self.residual, name)
    }

    #[must_use]
    pub fn residual(&self, name: &str) -> DVectorView<'_, f64> {
        self.layout.view(&*self.residual, name)
    }

    /// Returns `true` if the solver wants analytic Jacobian blocks.
    #[must_use]
    pub fn wants_jacobian(&self) -> bool {
        self.jacobian.is_some()
    }

    /// The Jacobian blocks, or `None` when the solver does not need them.
    pub fn jacobian_mut(&mut self) -> Option<&mut JacobianBlocks<'a>> {
        self.jacobian.as_mut()
    }
}

/// A dense Jacobian addressed by pairs of variable names.
///
/// Block `(row, col)` holds `∂R_row / ∂Δcol`. Diagonal blocks that are
/// handed out through [`JacobianBlocks::block_mut`] are recorded so the
/// solver can tell which self-derivatives the behaviour provided.
pub struct JacobianBlocks<'a> {
    layout: &'a Layout,
    matrix: &'a mut DMatrix<f64>,
    provided: &'a mut [bool],
}

impl<'a> JacobianBlocks<'a> {
    /// Wraps `matrix`, recording provided diagonal blocks in `provided`.
    ///
    /// # Panics
    ///
    /// Panics if `provided` does not have one entry per layout slot or if
    /// `matrix` is not square of the layout length.
    #[must_use]
    pub fn new(layout: &'a Layout, matrix: &'a mut DMatrix<f64>, provided: &'a mut [bool]) -> Self {
        assert_eq!(provided.len(), layout.slots().len());
        assert_eq!(matrix.shape(), (layout.len(), layout.len()));
        Self {
            layout,
            matrix,
            provided,
        }
    }

    /// Returns the mutable block `∂R_row / ∂Δcol`.
    pub fn block_mut(&mut self, row: &str, col: &str) -> DMatrixViewMut<'_, f64> {
        if row == col {
            if let Some(index) = self.layout.slots().iter().position(|s| s.name() == row) {
                self.provided[index] = true;
            }
        }
        self.layout.block_mut(&mut *self.matrix, row, col)
    }

    #[must_use]
    pub fn block(&self, row: &str, col: &str) -> DMatrixView<'_, f64> {
        self.layout.block(&*self.matrix, row, col)
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        self.layout
    }
}
