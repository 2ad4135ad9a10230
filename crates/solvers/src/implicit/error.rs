use ravel_core::LayoutError;

use super::ConfigError;

/// Errors that can occur when setting up an [`Integrator`](super::Integrator).
///
/// Numerical trouble during a solve is never an `Error`; it is reported as
/// [`Outcome::Failed`](super::Outcome::Failed).
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid variables: {0}")]
    Layout(#[from] LayoutError),

    #[error("`{name}` is not a state variable (referenced by {context})")]
    UnknownVariable { name: String, context: &'static str },
}
