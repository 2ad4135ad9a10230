//! Reference material behaviours for the ravel implicit solver.
//!
//! - [`stensor`]: symmetric tensor helpers in the `√2` convention
//! - [`Norton`]: isotropic elasticity with Norton viscoplastic flow

pub mod stensor;

mod norton;

pub use norton::{Norton, NortonError};
