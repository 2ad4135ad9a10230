//! Cast3M vector extrapolation.
//!
//! The last three corrections `v0, v1, v2` are treated as fixed-point
//! residuals of the unknowns `u0, u1, u2` they produced. A Schmidt
//! orthonormalization of `v1 − v0` and `v2 − v0` gives the affine
//! combination `r0 + r1 + r2 = 1` that minimizes `‖Σ rᵢ·vᵢ‖`, and the
//! same combination of the `uᵢ` becomes the new unknowns. For a linear
//! iteration in two dimensions the result is the exact fixed point.

use nalgebra::DVector;

use super::Acceleration;

pub(super) struct Accelerator {
    trigger: usize,
    period: usize,
    unknowns: [DVector<f64>; 3],
    corrections: [DVector<f64>; 3],
}

impl Accelerator {
    pub(super) fn new(settings: Acceleration, n: usize) -> Self {
        Self {
            trigger: settings.trigger,
            period: settings.period,
            unknowns: std::array::from_fn(|_| DVector::zeros(n)),
            corrections: std::array::from_fn(|_| DVector::zeros(n)),
        }
    }

    /// Stores the unknowns reached by correction `iter`.
    pub(super) fn record(&mut self, iter: usize, unknowns: &DVector<f64>, correction: &DVector<f64>) {
        self.unknowns[iter % 3].copy_from(unknowns);
        self.corrections[iter % 3].copy_from(correction);
    }

    pub(super) fn is_due(&self, iter: usize) -> bool {
        iter > self.trigger && (iter - self.trigger) % self.period == 0
    }

    /// Returns the extrapolated unknowns, or `None` if the stored
    /// corrections are too close to collinear.
    pub(super) fn extrapolate(&self) -> Option<DVector<f64>> {
        let [v0, v1, v2] = &self.corrections;
        let basis = schmidt(v0, v1, v2)?;

        let c0 = -v0.dot(&basis.e0);
        let c1 = -v0.dot(&basis.e1);
        let r1 = c0 * basis.k0 + c1 * basis.k1;
        let r2 = c1 * basis.k2;
        let r0 = 1.0 - r1 - r2;

        let [u0, u1, u2] = &self.unknowns;
        Some(u0 * r0 + u1 * r1 + u2 * r2)
    }
}

/// Orthonormal basis of the plane spanned by `v1 − v0` and `v2 − v0`.
///
/// `v1 − v0 = e0 / k0` and `v2 − v0 = −k1 / (k0·k2)·e0 + e1 / k2`.
struct Basis {
    k0: f64,
    k1: f64,
    k2: f64,
    e0: DVector<f64>,
    e1: DVector<f64>,
}

fn schmidt(v0: &DVector<f64>, v1: &DVector<f64>, v2: &DVector<f64>) -> Option<Basis> {
    let magnitude: f64 = v0
        .iter()
        .zip(v1.iter())
        .zip(v2.iter())
        .map(|((a, b), c)| a.abs() + b.abs() + c.abs())
        .sum();
    let degenerate = |norm: f64| norm < magnitude * f64::EPSILON || norm < 10.0 * f64::MIN_POSITIVE;

    let mut e0 = v1 - v0;
    let norm = e0.norm();
    if degenerate(norm) {
        return None;
    }
    let k0 = 1.0 / norm;
    e0 *= k0;

    let d2 = v2 - v0;
    let projection = d2.dot(&e0);
    let mut e1 = d2 - &e0 * projection;
    let norm = e1.norm();
    if degenerate(norm) {
        return None;
    }
    let k2 = 1.0 / norm;
    e1 *= k2;

    Some(Basis {
        k0,
        k1: -projection * k2 * k0,
        k2,
        e0,
        e1,
    })
}
