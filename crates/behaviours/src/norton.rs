use nalgebra::{DMatrix, DVector};
use ravel_core::{
    Behaviour, Hypothesis, JacobianBlocks, Point, Sensitivities, StateVariable, System, Variable,
};
use thiserror::Error;
use uom::si::{
    f64::{Frequency, Pressure, Ratio},
    frequency::hertz,
    pressure::{megapascal, pascal},
    ratio::ratio,
};

use crate::stensor;

/// Equivalent stresses below this fraction of the reference stress are
/// treated as zero when computing the flow direction.
const VANISHING_STRESS: f64 = 1e-12;

/// Errors raised by [`Norton`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NortonError {
    /// Plane stress needs an extra unknown for the axial strain.
    #[error("Norton does not support {0:?}")]
    Unsupported(Hypothesis),

    /// The flow rate overflowed at the evaluated stress.
    #[error("equivalent stress {seq:e} Pa is outside the range of the flow rule")]
    StressOutOfRange { seq: f64 },

    /// The tangent was requested without extracting the `eel` sensitivities.
    #[error("consistent tangent needs the sensitivities of eel")]
    MissingSensitivities,
}

/// Small-strain isotropic elasticity with Norton viscoplastic flow.
///
/// The unknowns are the elastic strain `eel` and the equivalent viscoplastic
/// strain `p`; the total strain `eto` drives the step. With `σ` the stress
/// at `t + θ·Δt`, `σeq` its von Mises equivalent and `n = 3/2·dev(σ)/σeq`:
///
/// ```text
/// f_eel = Δeel − Δeto + Δp·n
/// f_p   = Δp − Δt·ε̇₀·(σeq/σ₀)^m
/// ```
///
/// The behaviour writes the exact Jacobian and assembles the consistent
/// tangent `D·∂Δeel/∂Δeto` when the integrator extracts the sensitivities of
/// `eel`.
#[derive(Debug, Clone, PartialEq)]
pub struct Norton {
    pub young: Pressure,
    pub poisson: Ratio,
    pub reference_stress: Pressure,
    pub reference_rate: Frequency,
    pub exponent: f64,
}

impl Default for Norton {
    /// A stainless steel at 600 °C, roughly.
    fn default() -> Self {
        Self {
            young: Pressure::new::<megapascal>(150_000.0),
            poisson: Ratio::new::<ratio>(0.3),
            reference_stress: Pressure::new::<megapascal>(100.0),
            reference_rate: Frequency::new::<hertz>(1e-6),
            exponent: 5.0,
        }
    }
}

impl Norton {
    /// Lamé coefficients `(λ, μ)` in pascal.
    #[must_use]
    pub fn lame(&self) -> (f64, f64) {
        let e = self.young.get::<pascal>();
        let nu = self.poisson.get::<ratio>();
        let lambda = e * nu / ((1.0 + nu) * (1.0 - 2.0 * nu));
        let mu = e / (2.0 * (1.0 + nu));
        (lambda, mu)
    }

    /// The elastic stiffness for tensors of `size` components, in pascal.
    #[must_use]
    pub fn stiffness(&self, size: usize) -> DMatrix<f64> {
        let (lambda, mu) = self.lame();
        stensor::isotropic_stiffness(size, lambda, mu)
    }

    /// Stress carried by an elastic strain, in pascal.
    #[must_use]
    pub fn stress(&self, elastic_strain: &DVector<f64>) -> DVector<f64> {
        self.stiffness(elastic_strain.len()) * elastic_strain
    }

    /// Equivalent viscoplastic strain rate at an equivalent stress.
    fn flow_rate(&self, seq: f64) -> f64 {
        let sigma0 = self.reference_stress.get::<pascal>();
        self.reference_rate.get::<hertz>() * (seq / sigma0).powf(self.exponent)
    }
}

impl Behaviour for Norton {
    type Error = NortonError;

    fn state_variables(&self) -> Vec<StateVariable> {
        vec![
            StateVariable::stensor("eel"),
            StateVariable::scalar("p").bounded_below(0.0),
        ]
    }

    fn driving_variables(&self) -> Vec<Variable> {
        vec![Variable::stensor("eto")]
    }

    fn residual(&self, point: &Point<'_>, system: &mut System<'_>) -> Result<(), NortonError> {
        let hypothesis = point.hypothesis();
        if hypothesis == Hypothesis::PlaneStress {
            return Err(NortonError::Unsupported(hypothesis));
        }

        let size = hypothesis.stensor_size();
        let (_, mu) = self.lame();
        let sigma0 = self.reference_stress.get::<pascal>();
        let theta = point.theta();
        let dt = point.time_increment();

        let sigma = self.stress(&point.mid("eel"));
        let seq = stensor::von_mises(&sigma);
        let rate = self.flow_rate(seq);
        if !rate.is_finite() {
            return Err(NortonError::StressOutOfRange { seq });
        }

        let yielding = seq > VANISHING_STRESS * sigma0;
        let normal = if yielding {
            stensor::deviator(&sigma) * (1.5 / seq)
        } else {
            DVector::zeros(size)
        };

        let deel = point.increment("eel").clone_owned();
        let dp = point.increment("p")[0];
        let deto = point.driving_increment("eto");

        system
            .residual_mut("eel")
            .copy_from(&(&deel - deto + &normal * dp));
        system.residual_mut("p")[0] = dp - dt * rate;

        let Some(jacobian) = system.jacobian_mut() else {
            return Ok(());
        };

        let mut df_eel = stensor::identity4(size);
        if yielding {
            let projector = stensor::deviatoric_projector(size) * 1.5;
            let nn = &normal * normal.transpose();
            df_eel += (projector - nn) * (2.0 * mu * theta * dp / seq);
        }
        jacobian.block_mut("eel", "eel").copy_from(&df_eel);
        jacobian.block_mut("eel", "p").copy_from(&normal);

        // dσeq/dΔeel = θ·D·n = 2μθ·n for a deviatoric n.
        let drate = if yielding {
            self.exponent * rate / seq
        } else {
            0.0
        };
        jacobian
            .block_mut("p", "eel")
            .copy_from(&(normal.transpose() * (-dt * drate * 2.0 * mu * theta)));
        jacobian.block_mut("p", "p")[(0, 0)] = 1.0;

        Ok(())
    }

    fn initial_jacobian(
        &self,
        point: &Point<'_>,
        jacobian: &mut JacobianBlocks<'_>,
    ) -> Result<(), NortonError> {
        // The elastic prediction has no flow: ∂f_eel/∂Δp = n at the start stress.
        let sigma = self.stress(&point.start("eel").clone_owned());
        let seq = stensor::von_mises(&sigma);
        if seq > VANISHING_STRESS * self.reference_stress.get::<pascal>() {
            let normal = stensor::deviator(&sigma) * (1.5 / seq);
            jacobian.block_mut("eel", "p").copy_from(&normal);
        }
        Ok(())
    }

    fn tangent_operator(
        &self,
        point: &Point<'_>,
        sensitivities: &Sensitivities,
    ) -> Result<Option<DMatrix<f64>>, NortonError> {
        let deel_deto = sensitivities
            .block("eel", "eel")
            .ok_or(NortonError::MissingSensitivities)?;
        let size = point.hypothesis().stensor_size();
        Ok(Some(self.stiffness(size) * deel_deto))
    }
}
