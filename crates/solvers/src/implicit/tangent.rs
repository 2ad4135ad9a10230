use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use ravel_core::{Layout, Sensitivities};

/// Extracts columns of the inverse of a converged normalized Jacobian.
///
/// For each requested variable `k` the system `J·X = Eₖ` is solved, with
/// `Eₖ` the identity columns of `k`. The solution is converted back to
/// physical units, `∂Δy_i/∂R_j = X[i, j]·f_i / f_j`.
///
/// Returns `None` if the Jacobian is singular.
pub(super) fn extract(
    layout: &Arc<Layout>,
    scales: &DVector<f64>,
    jacobian: DMatrix<f64>,
    variables: &[String],
) -> Option<Sensitivities> {
    let n = layout.len();
    let lu = jacobian.lu();
    if !lu.is_invertible() {
        return None;
    }

    let mut sensitivities = Sensitivities::new(Arc::clone(layout));
    for variable in variables {
        let range = layout.range(variable);
        let mut rhs = DMatrix::zeros(n, range.len());
        for (col, row) in range.clone().enumerate() {
            rhs[(row, col)] = 1.0;
        }

        let mut columns = lu.solve(&rhs)?;
        for (col, j) in range.enumerate() {
            for i in 0..n {
                columns[(i, col)] *= scales[i] / scales[j];
            }
        }
        sensitivities.insert(variable, columns);
    }

    log::trace!("extracted sensitivities for {} variable(s)", variables.len());
    Some(sensitivities)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ravel_core::{Hypothesis, StateVariable};

    use super::*;

    fn layout() -> Arc<Layout> {
        Arc::new(
            Layout::for_state(
                Hypothesis::Tridimensional,
                &[
                    StateVariable::scalar("a").normalized(100.0),
                    StateVariable::scalar("b"),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn recovers_the_physical_inverse() {
        let layout = layout();
        let scales = DVector::from_vec(vec![100.0, 1.0]);

        // Physical Jacobian [[2, 1], [4, 3]], inverse [[1.5, -0.5], [-2, 1]].
        let physical = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 4.0, 3.0]);
        let normalized = DMatrix::from_fn(2, 2, |i, j| physical[(i, j)] * scales[j] / scales[i]);

        let sensitivities =
            extract(&layout, &scales, normalized, &["a".to_owned(), "b".to_owned()]).unwrap();

        assert_relative_eq!(sensitivities.block("a", "a").unwrap()[(0, 0)], 1.5, epsilon = 1e-12);
        assert_relative_eq!(sensitivities.block("a", "b").unwrap()[(0, 0)], -0.5, epsilon = 1e-12);
        assert_relative_eq!(sensitivities.block("b", "a").unwrap()[(0, 0)], -2.0, epsilon = 1e-12);
        assert_relative_eq!(sensitivities.block("b", "b").unwrap()[(0, 0)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn singular_jacobian_yields_nothing() {
        let layout = layout();
        let scales = DVector::from_element(2, 1.0);
        let jacobian = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(extract(&layout, &scales, jacobian, &["a".to_owned()]).is_none());
    }
}
