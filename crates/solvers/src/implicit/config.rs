use std::{collections::BTreeMap, fmt, str::FromStr};

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::Deserialize;

/// The resolution algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(try_from = "String"))]
pub enum Algorithm {
    /// Newton-Raphson with the analytic Jacobian of the behaviour.
    NewtonRaphson,

    /// Newton-Raphson with a central-difference Jacobian.
    NewtonRaphsonNumericalJacobian,

    /// Broyden's first method, rank-one updates of the Jacobian.
    Broyden,

    /// Broyden's second method, rank-one updates of the inverse Jacobian.
    Broyden2,

    /// Levenberg-Marquardt with the analytic Jacobian of the behaviour.
    LevenbergMarquardt,

    /// Levenberg-Marquardt with a central-difference Jacobian.
    LevenbergMarquardtNumericalJacobian,
}

impl Algorithm {
    /// The name used in configuration files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::NewtonRaphson => "NewtonRaphson",
            Self::NewtonRaphsonNumericalJacobian => "NewtonRaphson_NumericalJacobian",
            Self::Broyden => "Broyden",
            Self::Broyden2 => "Broyden2",
            Self::LevenbergMarquardt => "LevenbergMarquardt",
            Self::LevenbergMarquardtNumericalJacobian => "LevenbergMarquardt_NumericalJacobian",
        }
    }

    /// Returns `true` if the Jacobian is always estimated numerically.
    #[must_use]
    pub fn uses_numerical_jacobian(self) -> bool {
        matches!(
            self,
            Self::NewtonRaphsonNumericalJacobian | Self::LevenbergMarquardtNumericalJacobian
        )
    }

    /// Returns `true` for the secant (Broyden) family.
    #[must_use]
    pub fn is_quasi_newton(self) -> bool {
        matches!(self, Self::Broyden | Self::Broyden2)
    }

    #[must_use]
    pub fn is_levenberg_marquardt(self) -> bool {
        matches!(
            self,
            Self::LevenbergMarquardt | Self::LevenbergMarquardtNumericalJacobian
        )
    }

    const ALL: [Self; 6] = [
        Self::NewtonRaphson,
        Self::NewtonRaphsonNumericalJacobian,
        Self::Broyden,
        Self::Broyden2,
        Self::LevenbergMarquardt,
        Self::LevenbergMarquardtNumericalJacobian,
    ];
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.name() == s)
            .ok_or_else(|| ConfigError::UnknownAlgorithm(s.to_owned()))
    }
}

impl TryFrom<String> for Algorithm {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// How a diagonal block missing from the analytic Jacobian is filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(rename_all = "snake_case"))]
pub enum MissingDiagonal {
    /// Use the identity, which is exact when `R_y = Δy − g(...)`.
    #[default]
    Identity,

    /// Leave the block at zero.
    Zero,
}

/// The Jacobian a Broyden solver starts from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(rename_all = "snake_case"))]
pub enum BroydenSeed {
    /// The identity, overwritten by [`Behaviour::initial_jacobian`].
    ///
    /// [`Behaviour::initial_jacobian`]: ravel_core::Behaviour::initial_jacobian
    #[default]
    Identity,

    /// A central-difference estimate at the initial point.
    Numerical,
}

/// The Jacobian factored to extract sensitivities at convergence.
///
/// Numerical-Jacobian algorithms always use a numerical Jacobian.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(rename_all = "snake_case"))]
pub enum TangentJacobian {
    #[default]
    Analytic,
    Numerical,
}

/// Cast3M acceleration settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default, deny_unknown_fields))]
pub struct Acceleration {
    /// First iteration after which the extrapolation may run.
    pub trigger: usize,

    /// Number of iterations between two extrapolations.
    pub period: usize,
}

impl Default for Acceleration {
    fn default() -> Self {
        Self {
            trigger: 10,
            period: 3,
        }
    }
}

/// Relaxation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default, deny_unknown_fields))]
pub struct Relaxation {
    /// First iteration at which corrections are damped.
    pub trigger: usize,

    /// Fraction of each correction that is kept, in `(0, 1]`.
    pub coefficient: f64,
}

impl Default for Relaxation {
    fn default() -> Self {
        Self {
            trigger: 10,
            coefficient: 0.5,
        }
    }
}

/// Maximum increments per iteration, in physical units.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default, deny_unknown_fields))]
pub struct IncrementLimits {
    /// Limit applied to every variable without its own limit.
    pub global: Option<f64>,

    /// Limits by variable name.
    pub variables: BTreeMap<String, f64>,
}

impl IncrementLimits {
    /// Returns the limit for `name`, falling back to the global one.
    #[must_use]
    pub fn for_variable(&self, name: &str) -> Option<f64> {
        self.variables.get(name).copied().or(self.global)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.global.is_none() && self.variables.is_empty()
    }
}

/// Levenberg-Marquardt damping parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default, deny_unknown_fields))]
pub struct LevenbergMarquardt {
    /// Initial damping.
    pub mu0: f64,

    /// Below this gain ratio a trial step is rejected.
    pub p0: f64,

    /// Below this gain ratio the damping grows.
    pub p1: f64,

    /// Above this gain ratio the damping shrinks.
    pub p2: f64,

    /// Lower bound of the damping.
    pub m: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            mu0: 1e-6,
            p0: 1e-4,
            p1: 0.25,
            p2: 0.75,
            m: 1e-8,
        }
    }
}

/// Errors that can occur when validating an implicit solver config.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown algorithm `{0}`")]
    UnknownAlgorithm(String),

    #[error("epsilon must be finite and positive")]
    Epsilon,

    #[error("theta must be within [0, 1]")]
    Theta,

    #[error("numerical_jacobian_epsilon must be finite and positive")]
    NumericalJacobianEpsilon,

    #[error("jacobian_comparison_criterion must be finite and non-negative")]
    JacobianComparisonCriterion,

    #[error("jacobian_update_period must be positive")]
    JacobianUpdatePeriod,

    #[error("acceleration trigger must be at least 3 and below max_iters")]
    AccelerationTrigger,

    #[error("acceleration period must be positive")]
    AccelerationPeriod,

    #[error("relaxation trigger must be below max_iters")]
    RelaxationTrigger,

    #[error("relaxation coefficient must be within (0, 1]")]
    RelaxationCoefficient,

    #[error("maximum increment of `{0}` must be finite and positive")]
    IncrementLimit(String),

    #[error("Levenberg-Marquardt parameters must satisfy 0 < p0 < p1 < p2 < 1, mu0 > 0 and m > 0")]
    LevenbergMarquardt,

    #[error("{option} is not supported by {algorithm}")]
    Unsupported {
        option: &'static str,
        algorithm: Algorithm,
    },
}

/// A builder for [`Config`].
///
/// Every setting has a default; [`ConfigBuilder::build`] validates the
/// combination. With the `serde` feature the builder can be read from a
/// configuration file, every field being optional.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default, deny_unknown_fields))]
pub struct ConfigBuilder {
    algorithm: Algorithm,
    epsilon: f64,
    max_iters: usize,
    theta: f64,
    numerical_jacobian_epsilon: Option<f64>,
    compare_to_numerical_jacobian: bool,
    jacobian_comparison_criterion: Option<f64>,
    jacobian_update_period: Option<usize>,
    acceleration: Option<Acceleration>,
    relaxation: Option<Relaxation>,
    increment_limits: IncrementLimits,
    missing_diagonal: MissingDiagonal,
    broyden_seed: BroydenSeed,
    tangent_jacobian: TangentJacobian,
    sensitivities: Vec<String>,
    levenberg_marquardt: LevenbergMarquardt,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::NewtonRaphson,
            epsilon: 1e-8,
            max_iters: 100,
            theta: 0.5,
            numerical_jacobian_epsilon: None,
            compare_to_numerical_jacobian: false,
            jacobian_comparison_criterion: None,
            jacobian_update_period: None,
            acceleration: None,
            relaxation: None,
            increment_limits: IncrementLimits::default(),
            missing_diagonal: MissingDiagonal::default(),
            broyden_seed: BroydenSeed::default(),
            tangent_jacobian: TangentJacobian::default(),
            sensitivities: Vec::new(),
            levenberg_marquardt: LevenbergMarquardt::default(),
        }
    }
}

impl ConfigBuilder {
    #[must_use]
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the convergence tolerance on `‖R‖ / N`.
    #[must_use]
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    #[must_use]
    pub fn max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Sets the implicit mixing parameter.
    #[must_use]
    pub fn theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    /// Sets the central-difference step, `0.1·epsilon` by default.
    #[must_use]
    pub fn numerical_jacobian_epsilon(mut self, step: f64) -> Self {
        self.numerical_jacobian_epsilon = Some(step);
        self
    }

    /// Compares the analytic Jacobian to a numerical one at each iteration.
    ///
    /// The criterion defaults to `epsilon`.
    #[must_use]
    pub fn compare_to_numerical_jacobian(mut self, criterion: Option<f64>) -> Self {
        self.compare_to_numerical_jacobian = true;
        self.jacobian_comparison_criterion = criterion;
        self
    }

    /// Recomputes the numerical Jacobian every `period` iterations only.
    #[must_use]
    pub fn jacobian_update_period(mut self, period: usize) -> Self {
        self.jacobian_update_period = Some(period);
        self
    }

    #[must_use]
    pub fn acceleration(mut self, acceleration: Acceleration) -> Self {
        self.acceleration = Some(acceleration);
        self
    }

    #[must_use]
    pub fn relaxation(mut self, relaxation: Relaxation) -> Self {
        self.relaxation = Some(relaxation);
        self
    }

    /// Limits every increment to `max` per iteration.
    #[must_use]
    pub fn max_increment(mut self, max: f64) -> Self {
        self.increment_limits.global = Some(max);
        self
    }

    /// Limits the increment of `variable` to `max` per iteration.
    #[must_use]
    pub fn max_increment_of(mut self, variable: impl Into<String>, max: f64) -> Self {
        self.increment_limits.variables.insert(variable.into(), max);
        self
    }

    #[must_use]
    pub fn missing_diagonal(mut self, policy: MissingDiagonal) -> Self {
        self.missing_diagonal = policy;
        self
    }

    #[must_use]
    pub fn broyden_seed(mut self, seed: BroydenSeed) -> Self {
        self.broyden_seed = seed;
        self
    }

    #[must_use]
    pub fn tangent_jacobian(mut self, source: TangentJacobian) -> Self {
        self.tangent_jacobian = source;
        self
    }

    /// Adds a variable whose inverse-Jacobian columns are extracted when a
    /// consistent tangent is requested.
    #[must_use]
    pub fn sensitivity(mut self, variable: impl Into<String>) -> Self {
        self.sensitivities.push(variable.into());
        self
    }

    #[must_use]
    pub fn levenberg_marquardt(mut self, parameters: LevenbergMarquardt) -> Self {
        self.levenberg_marquardt = parameters;
        self
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a tolerance or step is not finite and positive, if
    /// theta is outside `[0, 1]`, if a trigger can never fire before
    /// `max_iters`, or if an option does not apply to the chosen algorithm.
    pub fn build(self) -> Result<Config, ConfigError> {
        let algorithm = self.algorithm;

        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(ConfigError::Epsilon);
        }
        if !(0.0..=1.0).contains(&self.theta) {
            return Err(ConfigError::Theta);
        }

        let numerical_jacobian_epsilon = self
            .numerical_jacobian_epsilon
            .unwrap_or(0.1 * self.epsilon);
        if !numerical_jacobian_epsilon.is_finite() || numerical_jacobian_epsilon <= 0.0 {
            return Err(ConfigError::NumericalJacobianEpsilon);
        }

        let jacobian_check = if self.compare_to_numerical_jacobian {
            if algorithm != Algorithm::NewtonRaphson {
                return Err(ConfigError::Unsupported {
                    option: "comparison to a numerical Jacobian",
                    algorithm,
                });
            }
            let criterion = self.jacobian_comparison_criterion.unwrap_or(self.epsilon);
            if !criterion.is_finite() || criterion < 0.0 {
                return Err(ConfigError::JacobianComparisonCriterion);
            }
            Some(criterion)
        } else {
            None
        };

        let jacobian_update_period = match self.jacobian_update_period {
            Some(0) => return Err(ConfigError::JacobianUpdatePeriod),
            Some(_) if !algorithm.uses_numerical_jacobian() => {
                return Err(ConfigError::Unsupported {
                    option: "jacobian_update_period",
                    algorithm,
                });
            }
            Some(period) => period,
            None => 1,
        };

        if let Some(acceleration) = self.acceleration {
            if algorithm.is_levenberg_marquardt() {
                return Err(ConfigError::Unsupported {
                    option: "acceleration",
                    algorithm,
                });
            }
            if acceleration.trigger < 3 || acceleration.trigger >= self.max_iters {
                return Err(ConfigError::AccelerationTrigger);
            }
            if acceleration.period == 0 {
                return Err(ConfigError::AccelerationPeriod);
            }
        }

        if let Some(relaxation) = self.relaxation {
            if algorithm.is_levenberg_marquardt() {
                return Err(ConfigError::Unsupported {
                    option: "relaxation",
                    algorithm,
                });
            }
            if relaxation.trigger >= self.max_iters {
                return Err(ConfigError::RelaxationTrigger);
            }
            let w = relaxation.coefficient;
            if !w.is_finite() || w <= 0.0 || w > 1.0 {
                return Err(ConfigError::RelaxationCoefficient);
            }
        }

        let valid_limit = |max: f64| max.is_finite() && max > 0.0;
        if let Some(global) = self.increment_limits.global {
            if !valid_limit(global) {
                return Err(ConfigError::IncrementLimit("global".into()));
            }
        }
        if let Some((name, _)) = self
            .increment_limits
            .variables
            .iter()
            .find(|(_, max)| !valid_limit(**max))
        {
            return Err(ConfigError::IncrementLimit(name.clone()));
        }

        let lm = self.levenberg_marquardt;
        let ordered = 0.0 < lm.p0 && lm.p0 < lm.p1 && lm.p1 < lm.p2 && lm.p2 < 1.0;
        if !ordered || !(lm.mu0.is_finite() && lm.mu0 > 0.0) || !(lm.m.is_finite() && lm.m > 0.0)
        {
            return Err(ConfigError::LevenbergMarquardt);
        }

        Ok(Config {
            algorithm,
            epsilon: self.epsilon,
            max_iters: self.max_iters,
            theta: self.theta,
            numerical_jacobian_epsilon,
            jacobian_check,
            jacobian_update_period,
            acceleration: self.acceleration,
            relaxation: self.relaxation,
            increment_limits: self.increment_limits,
            missing_diagonal: self.missing_diagonal,
            broyden_seed: self.broyden_seed,
            tangent_jacobian: self.tangent_jacobian,
            sensitivities: self.sensitivities,
            levenberg_marquardt: lm,
        })
    }
}

/// Validated configuration of the implicit solver.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    algorithm: Algorithm,
    epsilon: f64,
    max_iters: usize,
    theta: f64,
    numerical_jacobian_epsilon: f64,
    jacobian_check: Option<f64>,
    jacobian_update_period: usize,
    acceleration: Option<Acceleration>,
    relaxation: Option<Relaxation>,
    increment_limits: IncrementLimits,
    missing_diagonal: MissingDiagonal,
    broyden_seed: BroydenSeed,
    tangent_jacobian: TangentJacobian,
    sensitivities: Vec<String>,
    levenberg_marquardt: LevenbergMarquardt,
}

impl Default for Config {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        ConfigBuilder::default().build().unwrap()
    }
}

impl Config {
    /// Starts a builder for the given algorithm with default settings.
    #[must_use]
    pub fn builder(algorithm: Algorithm) -> ConfigBuilder {
        ConfigBuilder::default().algorithm(algorithm)
    }

    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Returns the convergence tolerance on `‖R‖ / N`.
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    #[must_use]
    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    #[must_use]
    pub fn theta(&self) -> f64 {
        self.theta
    }

    #[must_use]
    pub fn numerical_jacobian_epsilon(&self) -> f64 {
        self.numerical_jacobian_epsilon
    }

    /// Returns the comparison criterion when comparison mode is on.
    #[must_use]
    pub fn jacobian_check(&self) -> Option<f64> {
        self.jacobian_check
    }

    #[must_use]
    pub fn jacobian_update_period(&self) -> usize {
        self.jacobian_update_period
    }

    #[must_use]
    pub fn acceleration(&self) -> Option<Acceleration> {
        self.acceleration
    }

    #[must_use]
    pub fn relaxation(&self) -> Option<Relaxation> {
        self.relaxation
    }

    #[must_use]
    pub fn increment_limits(&self) -> &IncrementLimits {
        &self.increment_limits
    }

    #[must_use]
    pub fn missing_diagonal(&self) -> MissingDiagonal {
        self.missing_diagonal
    }

    #[must_use]
    pub fn broyden_seed(&self) -> BroydenSeed {
        self.broyden_seed
    }

    #[must_use]
    pub fn tangent_jacobian(&self) -> TangentJacobian {
        self.tangent_jacobian
    }

    #[must_use]
    pub fn sensitivities(&self) -> &[String] {
        &self.sensitivities
    }

    #[must_use]
    pub fn levenberg_marquardt(&self) -> LevenbergMarquardt {
        self.levenberg_marquardt
    }
}
