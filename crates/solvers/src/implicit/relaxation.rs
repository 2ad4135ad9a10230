use nalgebra::DVector;

use super::Relaxation;

/// Damps the last update once `iter` reaches the relaxation trigger.
///
/// `z ← z − (1 − w)·(z − z_prev)`, so only the fraction `w` of the step from
/// `previous` is kept. Returns whether the update was damped.
pub(super) fn relax(
    settings: Relaxation,
    iter: usize,
    unknowns: &mut DVector<f64>,
    previous: &DVector<f64>,
) -> bool {
    if iter < settings.trigger {
        return false;
    }
    let step = &*unknowns - previous;
    unknowns.axpy(-(1.0 - settings.coefficient), &step, 1.0);
    true
}
