//! Local nonlinear solvers for the implicit integration of material behaviours.
//!
//! A behaviour describes its evolution over a time step as a residual system
//! `R(Δy) = 0` in the increments of its state variables. The solvers in this
//! crate find those increments at one material point, report progress to an
//! [`Observer`], and optionally extract the consistent tangent operator.
//!
//! # Solvers
//!
//! - [`implicit`]: Newton-Raphson, Broyden and Levenberg-Marquardt variants
//!   with acceleration, relaxation and increment limits
//!
//! [`Observer`]: ravel_core::Observer

pub mod implicit;
