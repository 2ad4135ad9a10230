/// A modelling hypothesis.
///
/// The hypothesis fixes the space dimension, which in turn fixes how many
/// components a symmetric tensor or a vector occupies in the unknown vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hypothesis {
    /// Full three-dimensional modelling.
    Tridimensional,

    /// Plane strain, `ε_zz = 0`.
    PlaneStrain,

    /// Plane stress, `σ_zz = 0`.
    PlaneStress,

    /// Generalised plane strain, `ε_zz` uniform.
    GeneralisedPlaneStrain,

    /// Axisymmetric modelling in the `(r, z)` plane.
    Axisymmetrical,

    /// One-dimensional axisymmetric modelling with uniform axial strain.
    AxisymmetricalGeneralisedPlaneStrain,
}

impl Hypothesis {
    /// Returns the space dimension (1, 2 or 3).
    #[must_use]
    pub fn space_dimension(self) -> usize {
        match self {
            Self::Tridimensional => 3,
            Self::PlaneStrain
            | Self::PlaneStress
            | Self::GeneralisedPlaneStrain
            | Self::Axisymmetrical => 2,
            Self::AxisymmetricalGeneralisedPlaneStrain => 1,
        }
    }

    /// Returns the number of components of a symmetric tensor.
    #[must_use]
    pub fn stensor_size(self) -> usize {
        match self.space_dimension() {
            1 => 3,
            2 => 4,
            _ => 6,
        }
    }

    /// Returns the number of components of a vector.
    #[must_use]
    pub fn vector_size(self) -> usize {
        self.space_dimension()
    }
}
