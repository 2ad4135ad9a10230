//! Capability traits for solver-agnostic observers.
//!
//! Observers written against these traits work with any solver whose event
//! and action types implement them, instead of matching on one solver's
//! event enum.
//!
//! # Event traits
//!
//! - [`HasIteration`]: events tagged with an iteration count
//! - [`HasResidual`]: events that may carry a residual norm
//!
//! # Action traits
//!
//! - [`CanStopEarly`]: actions that can abandon the attempt
//!
//! # Example
//!
//! ```rust
//! use ravel_core::Observer;
//! use ravel_observers::traits::{CanStopEarly, HasIteration, HasResidual};
//!
//! /// Gives up once the residual stops improving after a few iterations.
//! struct Stagnation {
//!     min_iters: usize,
//!     best: f64,
//! }
//!
//! impl<E: HasIteration + HasResidual, A: CanStopEarly> Observer<E, A> for Stagnation {
//!     fn observe(&mut self, event: &E) -> Option<A> {
//!         let norm = event.residual_norm()?;
//!         if event.iter() >= self.min_iters && norm >= self.best {
//!             return Some(A::stop_early());
//!         }
//!         self.best = self.best.min(norm);
//!         None
//!     }
//! }
//! ```

use ravel_solvers::implicit;

/// An event emitted at a known iteration.
pub trait HasIteration {
    /// Number of corrections applied when the event was emitted.
    fn iter(&self) -> usize;
}

/// An event that may carry a residual norm.
pub trait HasResidual {
    /// Returns the residual norm, or `None` when the event is not an
    /// evaluation (failures, diagnostics).
    fn residual_norm(&self) -> Option<f64>;

    /// Returns `true` if the event reports a rejected evaluation.
    fn is_failure(&self) -> bool {
        false
    }
}

/// An action type that can signal early termination.
pub trait CanStopEarly {
    fn stop_early() -> Self;
}

impl<E> HasIteration for implicit::Event<'_, E> {
    fn iter(&self) -> usize {
        implicit::Event::iter(self)
    }
}

impl<E> HasResidual for implicit::Event<'_, E> {
    fn residual_norm(&self) -> Option<f64> {
        implicit::Event::residual_norm(self)
    }

    fn is_failure(&self) -> bool {
        matches!(
            self,
            implicit::Event::BehaviourFailed { .. } | implicit::Event::NonFiniteResidual { .. }
        )
    }
}

impl CanStopEarly for implicit::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}
