use crate::Hypothesis;

/// The numeric kind of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// A single real value.
    Scalar,

    /// A symmetric second-order tensor, stored with `√2` on off-diagonal terms.
    Stensor,

    /// A vector of the space dimension.
    Vector,
}

impl VariableKind {
    /// Returns the number of components of one value of this kind.
    #[must_use]
    pub fn size(self, hypothesis: Hypothesis) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Stensor => hypothesis.stensor_size(),
            Self::Vector => hypothesis.vector_size(),
        }
    }
}

/// A named variable with a kind and an array size.
///
/// Driving variables (such as the total strain) are described by plain
/// `Variable`s. Unknowns are described by [`StateVariable`]s, which add a
/// normalization factor and physical bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    kind: VariableKind,
    array_size: usize,
}

impl Variable {
    /// Creates a variable of the given kind with an array size of one.
    pub fn new(name: impl Into<String>, kind: VariableKind) -> Self {
        Self {
            name: name.into(),
            kind,
            array_size: 1,
        }
    }

    /// Creates a scalar variable.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Scalar)
    }

    /// Creates a symmetric tensor variable.
    pub fn stensor(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Stensor)
    }

    /// Creates a vector variable.
    pub fn vector(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Vector)
    }

    /// Turns the variable into an array of `size` values.
    ///
    /// A size of zero is rejected when the layout is built.
    #[must_use]
    pub fn array(mut self, size: usize) -> Self {
        self.array_size = size;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    #[must_use]
    pub fn array_size(&self) -> usize {
        self.array_size
    }
}

/// Physical bounds on the value of a state variable.
///
/// Bounds apply to every component of the variable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl Bounds {
    /// Returns `value` moved inside the bounds.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        let value = self.lower.map_or(value, |lower| value.max(lower));
        self.upper.map_or(value, |upper| value.min(upper))
    }

    /// Returns `true` if neither bound is set.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }
}

/// An unknown of the implicit system: a state variable increment.
///
/// The normalization factor `f` rescales the unknown so that the solver
/// works on `Δy / f`. It conditions the linear solves when state variables
/// differ by orders of magnitude and never changes the converged increments.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVariable {
    variable: Variable,
    normalization: Option<f64>,
    bounds: Bounds,
}

impl StateVariable {
    /// Creates a state variable of the given kind.
    pub fn new(name: impl Into<String>, kind: VariableKind) -> Self {
        Self {
            variable: Variable::new(name, kind),
            normalization: None,
            bounds: Bounds::default(),
        }
    }

    /// Creates a scalar state variable.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Scalar)
    }

    /// Creates a symmetric tensor state variable.
    pub fn stensor(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Stensor)
    }

    /// Creates a vector state variable.
    pub fn vector(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Vector)
    }

    /// Turns the state variable into an array of `size` values.
    #[must_use]
    pub fn array(mut self, size: usize) -> Self {
        self.variable = self.variable.array(size);
        self
    }

    /// Sets the normalization factor.
    #[must_use]
    pub fn normalized(mut self, factor: f64) -> Self {
        self.normalization = Some(factor);
        self
    }

    /// Sets a lower physical bound on the value at the end of the step.
    #[must_use]
    pub fn bounded_below(mut self, lower: f64) -> Self {
        self.bounds.lower = Some(lower);
        self
    }

    /// Sets an upper physical bound on the value at the end of the step.
    #[must_use]
    pub fn bounded_above(mut self, upper: f64) -> Self {
        self.bounds.upper = Some(upper);
        self
    }

    #[must_use]
    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.variable.name()
    }

    /// Returns the normalization factor, or `1.0` when none is set.
    #[must_use]
    pub fn normalization(&self) -> f64 {
        self.normalization.unwrap_or(1.0)
    }

    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }
}
