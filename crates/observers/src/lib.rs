//! Reusable observers for ravel solvers.
//!
//! This crate provides [`Observer`] implementations and capability traits
//! that work with any solver whose events implement them.
//!
//! # Modules
//!
//! - [`traits`]: capability traits ([`HasIteration`], [`HasResidual`],
//!   [`CanStopEarly`])
//! - [`ConvergenceHistory`]: records residual norms and reports how fast
//!   they contract
//!
//! # Features
//!
//! - `plot`: enables [`PlotObserver`] for viewing convergence in an egui
//!   window. This adds dependencies on `eframe` and `egui_plot`.
//!
//! [`Observer`]: ravel_core::Observer
//! [`HasIteration`]: traits::HasIteration
//! [`HasResidual`]: traits::HasResidual
//! [`CanStopEarly`]: traits::CanStopEarly

pub mod traits;

mod convergence;

#[cfg(feature = "plot")]
mod plot;

pub use convergence::ConvergenceHistory;

#[cfg(feature = "plot")]
pub use plot::{PlotObserver, Plottable, ShowConfig};
