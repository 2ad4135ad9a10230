use std::error::Error as StdError;

use nalgebra::DMatrix;

use crate::{JacobianBlocks, Point, Sensitivities, StateVariable, System, Variable};

/// A material behaviour integrated implicitly over a time step.
///
/// The behaviour declares its unknowns (state variable increments) and its
/// driving variables, then writes the residual of its evolution equations at
/// any candidate point. When the solver asks for it, the behaviour also
/// writes analytic Jacobian blocks; blocks it leaves out are either
/// estimated numerically or filled according to the solver configuration.
///
/// Implementations must be pure: two calls with the same point must write
/// the same values.
///
/// # Example
///
/// ```
/// use std::convert::Infallible;
///
/// use ravel_core::{Behaviour, Point, StateVariable, System};
///
/// /// Relaxes `x` towards 2.
/// struct Target;
///
/// impl Behaviour for Target {
///     type Error = Infallible;
///
///     fn state_variables(&self) -> Vec<StateVariable> {
///         vec![StateVariable::scalar("x")]
///     }
///
///     fn residual(&self, point: &Point<'_>, system: &mut System<'_>) -> Result<(), Infallible> {
///         system.residual_mut("x")[0] = point.end("x")[0] - 2.0;
///         if let Some(jacobian) = system.jacobian_mut() {
///             jacobian.block_mut("x", "x")[(0, 0)] = 1.0;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Behaviour {
    type Error: StdError + Send + Sync + 'static;

    /// The unknowns, in the order they are laid out.
    fn state_variables(&self) -> Vec<StateVariable>;

    /// The externally imposed variables, in the order they are laid out.
    fn driving_variables(&self) -> Vec<Variable> {
        Vec::new()
    }

    /// Writes the residual and, if requested, the analytic Jacobian.
    ///
    /// # Errors
    ///
    /// Returns an error when the point is outside the validity domain of the
    /// law. The solver then shortens its last correction, or fails if no
    /// correction was applied yet.
    fn residual(&self, point: &Point<'_>, system: &mut System<'_>) -> Result<(), Self::Error>;

    /// Overwrites blocks of the identity used to start quasi-Newton solvers.
    ///
    /// # Errors
    ///
    /// An error fails the integration attempt.
    fn initial_jacobian(
        &self,
        _point: &Point<'_>,
        _jacobian: &mut JacobianBlocks<'_>,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Assembles the consistent tangent operator after convergence.
    ///
    /// Returns `None` when the behaviour does not provide one.
    ///
    /// # Errors
    ///
    /// An error fails the integration attempt.
    fn tangent_operator(
        &self,
        _point: &Point<'_>,
        _sensitivities: &Sensitivities,
    ) -> Result<Option<DMatrix<f64>>, Self::Error> {
        Ok(None)
    }
}
