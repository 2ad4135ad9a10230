use ravel_core::Observer;

use crate::traits::{HasIteration, HasResidual};

/// Records the residual norms reported by a solver.
///
/// The history never steers the solver. After the attempt it tells how many
/// evaluations were rejected and how fast the residual contracted, which is
/// the usual way to tell a consistent Jacobian (quadratic contraction) from
/// an approximate one (linear contraction).
///
/// Pass `&mut history` as the observer to keep access to it afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvergenceHistory {
    norms: Vec<(usize, f64)>,
    failures: usize,
}

impl ConvergenceHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded `(iter, residual_norm)` pairs, in emission order.
    #[must_use]
    pub fn norms(&self) -> &[(usize, f64)] {
        &self.norms
    }

    /// Number of rejected evaluations.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// The last recorded residual norm.
    #[must_use]
    pub fn last(&self) -> Option<f64> {
        self.norms.last().map(|&(_, norm)| norm)
    }

    /// Ratio of the last two residual norms.
    #[must_use]
    pub fn contraction(&self) -> Option<f64> {
        match self.norms.as_slice() {
            [.., (_, previous), (_, last)] if *previous > 0.0 => Some(last / previous),
            _ => None,
        }
    }

    /// Observed order of convergence from the last three residual norms.
    ///
    /// Close to 1 for a linearly converging iteration and close to 2 for
    /// Newton with an exact Jacobian. Returns `None` with fewer than three
    /// norms or when any of them is zero.
    #[must_use]
    pub fn order(&self) -> Option<f64> {
        let [.., (_, r0), (_, r1), (_, r2)] = self.norms.as_slice() else {
            return None;
        };
        if *r0 <= 0.0 || *r1 <= 0.0 || *r2 <= 0.0 || r0 == r1 {
            return None;
        }
        Some((r2 / r1).ln() / (r1 / r0).ln())
    }

    /// Forgets everything recorded so far.
    pub fn clear(&mut self) {
        self.norms.clear();
        self.failures = 0;
    }

    fn record<E: HasIteration + HasResidual>(&mut self, event: &E) {
        if event.is_failure() {
            self.failures += 1;
        } else if let Some(norm) = event.residual_norm() {
            self.norms.push((event.iter(), norm));
        }
    }
}

impl<E, A> Observer<E, A> for ConvergenceHistory
where
    E: HasIteration + HasResidual,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self.record(event);
        None
    }
}

impl<E, A> Observer<E, A> for &mut ConvergenceHistory
where
    E: HasIteration + HasResidual,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self.record(event);
        None
    }
}
