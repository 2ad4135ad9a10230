use nalgebra::{DMatrix, DVector};
use ravel_core::{Behaviour, Layout};

use super::evaluate::{EvalError, Evaluator};

/// An analytic Jacobian block that disagrees with its numerical estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct JacobianMismatch {
    /// Variable whose residual rows the block covers.
    pub row: String,

    /// Variable whose unknown columns the block covers.
    pub col: String,

    /// Largest absolute difference between the two blocks.
    pub max_difference: f64,

    /// Threshold the difference was compared to.
    pub tolerance: f64,
}

/// Estimates the Jacobian by central differences.
///
/// Column `i` is `(R(z + ε·eᵢ) − R(z − ε·eᵢ)) / 2ε`. `unknowns` is perturbed
/// in place and restored before returning, on success or failure.
pub(super) fn estimate<B: Behaviour>(
    evaluator: &mut Evaluator<'_, B>,
    unknowns: &mut DVector<f64>,
    epsilon: f64,
    jacobian: &mut DMatrix<f64>,
) -> Result<(), EvalError<B::Error>> {
    let n = evaluator.len();
    let mut minus = DVector::zeros(n);
    let mut plus = DVector::zeros(n);

    for i in 0..n {
        let baseline = unknowns[i];

        unknowns[i] = baseline - epsilon;
        let backward = evaluator.residual(unknowns, &mut minus);

        unknowns[i] = baseline + epsilon;
        let forward = backward.and_then(|()| evaluator.residual(unknowns, &mut plus));

        unknowns[i] = baseline;
        forward?;

        jacobian.set_column(i, &((&plus - &minus) / (2.0 * epsilon)));
    }

    log::trace!("numerical jacobian estimated with step {epsilon:e}");
    Ok(())
}

/// Compares an analytic Jacobian to a numerical estimate block by block.
///
/// Block `(y, k)` is reported when one of its components differs by more
/// than `criterion · size(y) · size(k)`, with sizes counted per array
/// element.
pub(super) fn compare(
    layout: &Layout,
    analytic: &DMatrix<f64>,
    numerical: &DMatrix<f64>,
    criterion: f64,
) -> Vec<JacobianMismatch> {
    let mut mismatches = Vec::new();

    for row in layout.slots() {
        for col in layout.slots() {
            let difference = layout.block(analytic, row.name(), col.name())
                - layout.block(numerical, row.name(), col.name());
            let max_difference = difference.amax();

            #[allow(clippy::cast_precision_loss)]
            let tolerance = criterion * (row.component_size() * col.component_size()) as f64;

            if max_difference > tolerance {
                mismatches.push(JacobianMismatch {
                    row: row.name().to_owned(),
                    col: col.name().to_owned(),
                    max_difference,
                    tolerance,
                });
            }
        }
    }

    mismatches
}
