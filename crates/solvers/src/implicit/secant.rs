//! Rank-one secant updates for the Broyden algorithms.

use nalgebra::{DMatrix, DVector};

/// A secant update whose direction is lost in round-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Degenerate;

/// Threshold on `s·s` below which a step is indistinguishable from noise.
///
/// Relative to the magnitude of the unknowns so that tiny but genuine steps
/// near a large solution are still accepted.
pub(super) fn noise_floor(unknowns: &DVector<f64>) -> f64 {
    100.0 * f64::EPSILON * f64::EPSILON * (1.0 + unknowns.norm_squared())
}

/// Broyden's "good" update of a Jacobian approximation.
///
/// `J ← J + ((y − J·s) ⊗ s) / (s·s)`, after which `J·s = y`.
pub(super) fn update_jacobian(
    jacobian: &mut DMatrix<f64>,
    step: &DVector<f64>,
    change: &DVector<f64>,
    floor: f64,
) -> Result<(), Degenerate> {
    let ss = step.norm_squared();
    if ss <= floor {
        return Err(Degenerate);
    }
    let defect = change - &*jacobian * step;
    jacobian.ger(1.0 / ss, &defect, step, 1.0);
    Ok(())
}

/// Broyden's update of an inverse Jacobian approximation.
///
/// `H ← H + ((s − H·y) ⊗ (sᵀ·H)) / (s·H·y)`, after which `H·y = s`.
pub(super) fn update_inverse(
    inverse: &mut DMatrix<f64>,
    step: &DVector<f64>,
    change: &DVector<f64>,
    floor: f64,
) -> Result<(), Degenerate> {
    if step.norm_squared() <= floor {
        return Err(Degenerate);
    }
    let hy = &*inverse * change;
    let denominator = step.dot(&hy);
    if denominator.abs() <= f64::EPSILON * step.norm() * hy.norm() || !denominator.is_finite() {
        return Err(Degenerate);
    }
    let sh = inverse.tr_mul(step);
    let defect = step - hy;
    inverse.ger(1.0 / denominator, &defect, &sh, 1.0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::dvector;

    use super::*;

    #[test]
    fn jacobian_update_satisfies_secant_condition() {
        let mut jacobian = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 1.0, 3.0]);
        let step = dvector![0.5, -1.0];
        let change = dvector![1.0, 4.0];

        update_jacobian(&mut jacobian, &step, &change, 0.0).unwrap();
        assert_relative_eq!(&jacobian * &step, change, epsilon = 1e-14);
    }

    #[test]
    fn inverse_update_satisfies_secant_condition() {
        let mut inverse = DMatrix::identity(2, 2);
        let step = dvector![0.5, -1.0];
        let change = dvector![1.0, 4.0];

        update_inverse(&mut inverse, &step, &change, 0.0).unwrap();
        assert_relative_eq!(&inverse * &change, step, epsilon = 1e-14);
    }

    #[test]
    fn vanishing_steps_are_degenerate() {
        let unknowns = dvector![1.0, 1.0];
        let floor = noise_floor(&unknowns);
        let step = dvector![1e-20, 0.0];
        let change = dvector![1.0, 0.0];

        let mut jacobian = DMatrix::identity(2, 2);
        assert_eq!(update_jacobian(&mut jacobian, &step, &change, floor), Err(Degenerate));
        assert_eq!(jacobian, DMatrix::identity(2, 2));

        let mut inverse = DMatrix::identity(2, 2);
        assert_eq!(update_inverse(&mut inverse, &step, &change, floor), Err(Degenerate));
    }

    #[test]
    fn orthogonal_inverse_image_is_degenerate() {
        // H·y = [0, 1] is orthogonal to s = [1, 0].
        let mut inverse = DMatrix::identity(2, 2);
        let step = dvector![1.0, 0.0];
        let change = dvector![0.0, 1.0];
        assert_eq!(update_inverse(&mut inverse, &step, &change, 0.0), Err(Degenerate));
    }
}
