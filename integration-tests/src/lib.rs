//! Test cases shared by the cross-crate tests.
//!
//! A [`Case`] is read from TOML and bundles a solver configuration, a Norton
//! material and one loading step:
//!
//! ```toml
//! [solver]
//! algorithm = "Broyden"
//! epsilon = 1e-12
//!
//! [material]
//! young = 150e3           # MPa
//! poisson = 0.3
//! reference_stress = 100  # MPa
//! reference_rate = 1e-6   # 1/s
//! exponent = 5
//!
//! [loading]
//! hypothesis = "Tridimensional"
//! time_increment = 10
//! strain_increment = [1e-3, -5e-4, -5e-4, 0, 0, 0]
//! ```

use ravel_behaviours::Norton;
use ravel_core::{Hypothesis, Step, StiffnessRequest};
use ravel_solvers::implicit::{ConfigBuilder, ConfigError, Error as SetupError, Integrator};
use serde::Deserialize;
use thiserror::Error;
use uom::si::{
    f64::{Frequency, Pressure, Ratio},
    frequency::hertz,
    pressure::megapascal,
    ratio::ratio,
};

#[derive(Debug, Error)]
pub enum CaseError {
    #[error("invalid case file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown hypothesis: {0}")]
    Hypothesis(String),

    #[error("strain increment has {found} components, {hypothesis:?} needs {expected}")]
    StrainSize {
        hypothesis: Hypothesis,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Setup(#[from] SetupError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Case {
    #[serde(default)]
    pub solver: ConfigBuilder,
    #[serde(default)]
    pub material: Material,
    pub loading: Loading,
}

/// Norton parameters in MPa and 1/s.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Material {
    pub young: f64,
    pub poisson: f64,
    pub reference_stress: f64,
    pub reference_rate: f64,
    pub exponent: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            young: 150e3,
            poisson: 0.3,
            reference_stress: 100.0,
            reference_rate: 1e-6,
            exponent: 5.0,
        }
    }
}

impl From<&Material> for Norton {
    fn from(material: &Material) -> Self {
        Self {
            young: Pressure::new::<megapascal>(material.young),
            poisson: Ratio::new::<ratio>(material.poisson),
            reference_stress: Pressure::new::<megapascal>(material.reference_stress),
            reference_rate: Frequency::new::<hertz>(material.reference_rate),
            exponent: material.exponent,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Loading {
    #[serde(default = "tridimensional")]
    pub hypothesis: String,
    pub time_increment: f64,
    pub strain_increment: Vec<f64>,
    #[serde(default)]
    pub tangent: bool,
}

fn tridimensional() -> String {
    "Tridimensional".to_owned()
}

impl Case {
    /// Parses a case from TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid case.
    pub fn from_toml(text: &str) -> Result<Self, CaseError> {
        Ok(toml::from_str(text)?)
    }

    /// Resolves the modelling hypothesis by name.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown name.
    pub fn hypothesis(&self) -> Result<Hypothesis, CaseError> {
        match self.loading.hypothesis.as_str() {
            "Tridimensional" => Ok(Hypothesis::Tridimensional),
            "PlaneStrain" => Ok(Hypothesis::PlaneStrain),
            "PlaneStress" => Ok(Hypothesis::PlaneStress),
            "GeneralisedPlaneStrain" => Ok(Hypothesis::GeneralisedPlaneStrain),
            "Axisymmetrical" => Ok(Hypothesis::Axisymmetrical),
            "AxisymmetricalGeneralisedPlaneStrain" => {
                Ok(Hypothesis::AxisymmetricalGeneralisedPlaneStrain)
            }
            other => Err(CaseError::Hypothesis(other.to_owned())),
        }
    }

    /// Builds the integrator and the loading step.
    ///
    /// The `eel` sensitivities are always extracted so that a requested
    /// tangent can be assembled.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or the loading is invalid.
    pub fn prepare(&self) -> Result<(Integrator<Norton>, Step), CaseError> {
        let hypothesis = self.hypothesis()?;
        let expected = hypothesis.stensor_size();
        if self.loading.strain_increment.len() != expected {
            return Err(CaseError::StrainSize {
                hypothesis,
                expected,
                found: self.loading.strain_increment.len(),
            });
        }

        let config = self.solver.clone().sensitivity("eel").build()?;
        let integrator = Integrator::new(Norton::from(&self.material), hypothesis, config)?;

        let stiffness = if self.loading.tangent {
            StiffnessRequest::ConsistentTangent
        } else {
            StiffnessRequest::None
        };
        let mut step = integrator
            .step()
            .with_time_increment(self.loading.time_increment)
            .with_stiffness(stiffness);
        step.set_driving_increment("eto", &self.loading.strain_increment);

        Ok((integrator, step))
    }
}
