//! Core traits and types for implicit integration of material behaviours.
//!
//! This crate defines what solvers and behaviours share:
//!
//! - [`Hypothesis`], [`Variable`] and [`StateVariable`]: what is integrated
//! - [`Layout`]: named variables mapped onto one flat buffer
//! - [`Step`]: the data of one integration step at one point
//! - [`Point`], [`System`] and [`JacobianBlocks`]: the context a behaviour
//!   reads and the equations it writes
//! - [`Behaviour`]: the constitutive law as a capability trait
//! - [`Sensitivities`]: blocks of the inverse Jacobian at convergence
//! - [`Observer`]: receives solver events and optionally returns actions

mod behaviour;
mod hypothesis;
mod layout;
mod observer;
mod point;
mod sensitivity;
mod step;
mod variable;

pub use behaviour::Behaviour;
pub use hypothesis::Hypothesis;
pub use layout::{Layout, LayoutError, Slot};
pub use observer::Observer;
pub use point::{JacobianBlocks, Point, System};
pub use sensitivity::Sensitivities;
pub use step::{Step, StiffnessRequest};
pub use variable::{Bounds, StateVariable, Variable, VariableKind};
