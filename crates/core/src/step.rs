use std::sync::Arc;

use nalgebra::{DVector, DVectorView};

use crate::Layout;

/// What the caller expects besides the integrated state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum StiffnessRequest {
    /// Only the state variables are needed.
    #[default]
    None,

    /// The consistent tangent operator must be computed at convergence.
    ConsistentTangent,
}

impl StiffnessRequest {
    #[must_use]
    pub fn is_requested(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// The data of one integration step at one integration point.
///
/// A step holds the state variables at the start of the step, the driving
/// variables at the start of the step and their increment, and the time
/// increment. Buffers are dimensioned from the layouts the step was created
/// with, so the solver always receives consistent data.
#[derive(Debug, Clone)]
pub struct Step {
    state_layout: Arc<Layout>,
    driving_layout: Arc<Layout>,
    state: DVector<f64>,
    driving: DVector<f64>,
    driving_increment: DVector<f64>,
    time_increment: f64,
    stiffness: StiffnessRequest,
}

impl Step {
    /// Creates a step with every value set to zero.
    #[must_use]
    pub fn new(state_layout: Arc<Layout>, driving_layout: Arc<Layout>) -> Self {
        let state = DVector::zeros(state_layout.len());
        let driving = DVector::zeros(driving_layout.len());
        let driving_increment = DVector::zeros(driving_layout.len());
        Self {
            state_layout,
            driving_layout,
            state,
            driving,
            driving_increment,
            time_increment: 0.0,
            stiffness: StiffnessRequest::None,
        }
    }

    /// Sets the time increment.
    #[must_use]
    pub fn with_time_increment(mut self, dt: f64) -> Self {
        self.time_increment = dt;
        self
    }

    /// Sets the stiffness request.
    #[must_use]
    pub fn with_stiffness(mut self, stiffness: StiffnessRequest) -> Self {
        self.stiffness = stiffness;
        self
    }

    /// Sets the value of a state variable at the start of the step.
    ///
    /// # Panics
    ///
    /// Panics if `name` is unknown or `values` has the wrong length.
    pub fn set_state(&mut self, name: &str, values: &[f64]) {
        self.state_layout
            .view_mut(&mut self.state, name)
            .copy_from_slice(values);
    }

    /// Sets the value of a driving variable at the start of the step.
    ///
    /// # Panics
    ///
    /// Panics if `name` is unknown or `values` has the wrong length.
    pub fn set_driving(&mut self, name: &str, values: &[f64]) {
        self.driving_layout
            .view_mut(&mut self.driving, name)
            .copy_from_slice(values);
    }

    /// Sets the increment of a driving variable over the step.
    ///
    /// # Panics
    ///
    /// Panics if `name` is unknown or `values` has the wrong length.
    pub fn set_driving_increment(&mut self, name: &str, values: &[f64]) {
        self.driving_layout
            .view_mut(&mut self.driving_increment, name)
            .copy_from_slice(values);
    }

    #[must_use]
    pub fn state_layout(&self) -> &Arc<Layout> {
        &self.state_layout
    }

    #[must_use]
    pub fn driving_layout(&self) -> &Arc<Layout> {
        &self.driving_layout
    }

    /// State variables at the start of the step, in layout order.
    #[must_use]
    pub fn state(&self) -> &DVector<f64> {
        &self.state
    }

    #[must_use]
    pub fn state_of(&self, name: &str) -> DVectorView<'_, f64> {
        self.state_layout.view(&self.state, name)
    }

    /// Driving variables at the start of the step, in layout order.
    #[must_use]
    pub fn driving(&self) -> &DVector<f64> {
        &self.driving
    }

    #[must_use]
    pub fn driving_increment(&self) -> &DVector<f64> {
        &self.driving_increment
    }

    #[must_use]
    pub fn time_increment(&self) -> f64 {
        self.time_increment
    }

    #[must_use]
    pub fn stiffness(&self) -> StiffnessRequest {
        self.stiffness
    }
}
