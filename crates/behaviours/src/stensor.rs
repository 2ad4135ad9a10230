//! Symmetric second-order tensors stored as vectors.
//!
//! Components are ordered `(xx, yy, zz, xy, xz, yz)` and truncated to the
//! hypothesis size (3, 4 or 6). Off-diagonal components carry a factor `√2`,
//! so the Euclidean dot product of two stored tensors equals their double
//! contraction and fourth-order tensors act as plain matrices.

use nalgebra::{DMatrix, DVector};

/// The second-order identity.
#[must_use]
pub fn identity(size: usize) -> DVector<f64> {
    DVector::from_fn(size, |i, _| if i < 3 { 1.0 } else { 0.0 })
}

#[must_use]
pub fn trace(s: &DVector<f64>) -> f64 {
    s.rows(0, 3).sum()
}

#[must_use]
pub fn deviator(s: &DVector<f64>) -> DVector<f64> {
    s - identity(s.len()) * (trace(s) / 3.0)
}

/// Von Mises equivalent `√(3/2 · s:s)` of the deviator `s`.
#[must_use]
pub fn von_mises(s: &DVector<f64>) -> f64 {
    (1.5 * deviator(s).norm_squared()).sqrt()
}

/// The fourth-order identity, `I`.
#[must_use]
pub fn identity4(size: usize) -> DMatrix<f64> {
    DMatrix::identity(size, size)
}

/// `I − (1 ⊗ 1) / 3`, which maps a tensor onto its deviator.
#[must_use]
pub fn deviatoric_projector(size: usize) -> DMatrix<f64> {
    let one = identity(size);
    identity4(size) - &one * one.transpose() / 3.0
}

/// Isotropic elastic stiffness `λ·1⊗1 + 2μ·I`.
#[must_use]
pub fn isotropic_stiffness(size: usize, lambda: f64, mu: f64) -> DMatrix<f64> {
    let one = identity(size);
    &one * one.transpose() * lambda + identity4(size) * (2.0 * mu)
}
