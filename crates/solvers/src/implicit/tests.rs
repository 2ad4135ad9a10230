use std::convert::Infallible;

use approx::assert_relative_eq;
use nalgebra::DMatrix;

use ravel_core::{
    Behaviour, Hypothesis, JacobianBlocks, LayoutError, Point, Sensitivities, StateVariable,
    StiffnessRequest, System, Variable,
};

use super::{
    Acceleration, Action, Algorithm, Config, Error, Event, Failure, FailureReason, Integrator,
    JacobianMismatch, MissingDiagonal, Outcome, Relaxation,
};

fn integrator<B: Behaviour>(behaviour: B, config: Config) -> Integrator<B> {
    Integrator::new(behaviour, Hypothesis::Tridimensional, config).expect("valid setup")
}

fn integrate<B: Behaviour>(behaviour: B, config: Config) -> Outcome {
    let integrator = integrator(behaviour, config);
    let step = integrator.step();
    integrator.integrate_unobserved(&step)
}

fn config(algorithm: Algorithm) -> Config {
    Config::builder(algorithm)
        .epsilon(1e-10)
        .build()
        .unwrap()
}

/// `R = Δx − 2`, without a Jacobian.
struct Target;

impl Behaviour for Target {
    type Error = Infallible;

    fn state_variables(&self) -> Vec<StateVariable> {
        vec![StateVariable::scalar("x")]
    }

    fn residual(&self, point: &Point<'_>, system: &mut System<'_>) -> Result<(), Infallible> {
        system.residual_mut("x")[0] = point.increment("x")[0] - 2.0;
        Ok(())
    }
}

#[test]
fn scalar_target_converges_in_one_iteration() {
    let config = Config::builder(Algorithm::NewtonRaphson)
        .max_iters(20)
        .build()
        .unwrap();
    let solution = integrate(Target, config)
        .into_result()
        .expect("should converge");

    assert_eq!(solution.iters, 1);
    assert_relative_eq!(solution.state("x")[0], 2.0);
    assert!(solution.sensitivities.is_none());
}

#[test]
fn zero_iterations_fail_unless_already_converged() {
    let config = Config::builder(Algorithm::NewtonRaphson)
        .max_iters(0)
        .build()
        .unwrap();

    let outcome = integrate(Target, config.clone());
    assert!(matches!(
        outcome,
        Outcome::Failed(Failure {
            reason: FailureReason::MaxIters,
            iters: 0
        })
    ));

    struct AtRest;
    impl Behaviour for AtRest {
        type Error = Infallible;
        fn state_variables(&self) -> Vec<StateVariable> {
            vec![StateVariable::scalar("x")]
        }
        fn residual(&self, point: &Point<'_>, system: &mut System<'_>) -> Result<(), Infallible> {
            system.residual_mut("x")[0] = point.increment("x")[0];
            Ok(())
        }
    }

    let solution = integrate(AtRest, config).into_result().unwrap();
    assert_eq!(solution.iters, 0);
}

#[test]
fn singular_jacobian_fails_on_first_solve() {
    let config = Config::builder(Algorithm::NewtonRaphson)
        .missing_diagonal(MissingDiagonal::Zero)
        .build()
        .unwrap();

    let outcome = integrate(Target, config);
    assert!(matches!(
        outcome,
        Outcome::Failed(Failure {
            reason: FailureReason::SingularJacobian,
            iters: 0
        })
    ));
}

/// `R = A·Δ − b` on two scalars with its exact Jacobian.
struct Linear {
    scale: f64,
}

impl Behaviour for Linear {
    type Error = Infallible;

    fn state_variables(&self) -> Vec<StateVariable> {
        vec![
            StateVariable::scalar("x").normalized(self.scale),
            StateVariable::scalar("y"),
        ]
    }

    fn residual(&self, point: &Point<'_>, system: &mut System<'_>) -> Result<(), Infallible> {
        let x = point.increment("x")[0];
        let y = point.increment("y")[0];
        system.residual_mut("x")[0] = 2.0 * x + 0.5 * y - 1.0;
        system.residual_mut("y")[0] = 0.3 * x + 1.5 * y - 2.0;
        if let Some(jacobian) = system.jacobian_mut() {
            jacobian.block_mut("x", "x")[(0, 0)] = 2.0;
            jacobian.block_mut("x", "y")[(0, 0)] = 0.5;
            jacobian.block_mut("y", "x")[(0, 0)] = 0.3;
            jacobian.block_mut("y", "y")[(0, 0)] = 1.5;
        }
        Ok(())
    }
}

#[test]
fn linear_law_converges_in_one_iteration_at_any_scale() {
    for scale in [1.0, 1e-3, 1e4] {
        let solution = integrate(Linear { scale }, config(Algorithm::NewtonRaphson))
            .into_result()
            .unwrap();

        assert_eq!(solution.iters, 1);
        assert_relative_eq!(solution.increment("x")[0], 0.5 / 2.85, epsilon = 1e-12);
        assert_relative_eq!(solution.increment("y")[0], 3.7 / 2.85, epsilon = 1e-12);
        assert_relative_eq!(solution.unknowns[0] * scale, solution.increments[0], epsilon = 1e-12);
    }
}

/// A mildly nonlinear system whose Jacobian stays close to the identity.
struct Mild {
    scale: f64,
}

impl Behaviour for Mild {
    type Error = Infallible;

    fn state_variables(&self) -> Vec<StateVariable> {
        vec![
            StateVariable::scalar("x").normalized(self.scale),
            StateVariable::scalar("y"),
        ]
    }

    fn residual(&self, point: &Point<'_>, system: &mut System<'_>) -> Result<(), Infallible> {
        let x = point.increment("x")[0];
        let y = point.increment("y")[0];
        system.residual_mut("x")[0] = x + 0.1 * x.powi(3) + 0.2 * y - 1.0;
        system.residual_mut("y")[0] = y + 0.1 * x.sin() - 0.5;
        if let Some(jacobian) = system.jacobian_mut() {
            jacobian.block_mut("x", "x")[(0, 0)] = 1.0 + 0.3 * x * x;
            jacobian.block_mut("x", "y")[(0, 0)] = 0.2;
            jacobian.block_mut("y", "x")[(0, 0)] = 0.1 * x.cos();
            jacobian.block_mut("y", "y")[(0, 0)] = 1.0;
        }
        Ok(())
    }
}

#[test]
fn normalization_does_not_change_the_solution() {
    let reference = integrate(Mild { scale: 1.0 }, config(Algorithm::NewtonRaphson))
        .into_result()
        .unwrap();

    for scale in [1e-3, 50.0] {
        let scaled = integrate(Mild { scale }, config(Algorithm::NewtonRaphson))
            .into_result()
            .unwrap();
        assert_relative_eq!(scaled.increments, reference.increments, epsilon = 1e-7);
    }
}

#[test]
fn every_algorithm_reaches_the_newton_solution() {
    let reference = integrate(Mild { scale: 1.0 }, config(Algorithm::NewtonRaphson))
        .into_result()
        .unwrap();

    for algorithm in [
        Algorithm::NewtonRaphsonNumericalJacobian,
        Algorithm::Broyden,
        Algorithm::Broyden2,
        Algorithm::LevenbergMarquardt,
        Algorithm::LevenbergMarquardtNumericalJacobian,
    ] {
        let config = Config::builder(algorithm)
            .epsilon(1e-10)
            .numerical_jacobian_epsilon(1e-7)
            .build()
            .unwrap();
        let solution = integrate(Mild { scale: 1.0 }, config)
            .into_result()
            .unwrap_or_else(|failure| panic!("{algorithm} failed: {failure}"));

        assert_relative_eq!(solution.increments, reference.increments, epsilon = 1e-8);
    }
}

#[test]
fn numerical_jacobian_may_be_reused() {
    let reference = integrate(Mild { scale: 1.0 }, config(Algorithm::NewtonRaphson))
        .into_result()
        .unwrap();

    let config = Config::builder(Algorithm::NewtonRaphsonNumericalJacobian)
        .epsilon(1e-10)
        .numerical_jacobian_epsilon(1e-7)
        .jacobian_update_period(3)
        .build()
        .unwrap();
    let solution = integrate(Mild { scale: 1.0 }, config).into_result().unwrap();
    assert_relative_eq!(solution.increments, reference.increments, epsilon = 1e-8);
}

/// `R = ∛(Δx − 1)`, on which Newton-Raphson doubles its error each iteration.
struct CubeRoot;

impl Behaviour for CubeRoot {
    type Error = Infallible;

    fn state_variables(&self) -> Vec<StateVariable> {
        vec![StateVariable::scalar("x")]
    }

    fn residual(&self, point: &Point<'_>, system: &mut System<'_>) -> Result<(), Infallible> {
        let r = (point.increment("x")[0] - 1.0).cbrt();
        system.residual_mut("x")[0] = r;
        if let Some(jacobian) = system.jacobian_mut() {
            jacobian.block_mut("x", "x")[(0, 0)] = 1.0 / (3.0 * r * r);
        }
        Ok(())
    }
}

fn evaluated_unknowns<B: Behaviour>(behaviour: B, config: Config) -> (Outcome, Vec<f64>) {
    let integrator = integrator(behaviour, config);
    let step = integrator.step();
    let mut seen = Vec::new();
    let outcome = integrator.integrate(&step, |event: &Event<'_, B::Error>| {
        if let Event::Evaluated { unknowns, .. } = event {
            seen.push(unknowns[0]);
        }
        None
    });
    (outcome, seen)
}

#[test]
fn relaxation_damps_an_oscillating_law() {
    let plain = Config::builder(Algorithm::NewtonRaphson)
        .max_iters(6)
        .build()
        .unwrap();
    let (outcome, seen) = evaluated_unknowns(CubeRoot, plain);
    assert!(!outcome.is_converged());
    for (actual, expected) in seen[3..6].iter().zip([9.0, -15.0, 33.0]) {
        assert_relative_eq!(*actual, expected, epsilon = 1e-9);
    }

    let relaxed = Config::builder(Algorithm::NewtonRaphson)
        .max_iters(6)
        .relaxation(Relaxation {
            trigger: 3,
            coefficient: 0.5,
        })
        .build()
        .unwrap();
    let (outcome, seen) = evaluated_unknowns(CubeRoot, relaxed);
    assert!(!outcome.is_converged());
    for (actual, expected) in seen[3..6].iter().zip([3.0, 0.0, 1.5]) {
        assert_relative_eq!(*actual, expected, epsilon = 1e-9);
    }
}

/// The linear law of [`Linear`] with only the diagonal of its Jacobian.
struct Approximate;

impl Behaviour for Approximate {
    type Error = Infallible;

    fn state_variables(&self) -> Vec<StateVariable> {
        vec![StateVariable::scalar("x"), StateVariable::scalar("y")]
    }

    fn residual(&self, point: &Point<'_>, system: &mut System<'_>) -> Result<(), Infallible> {
        let x = point.increment("x")[0];
        let y = point.increment("y")[0];
        system.residual_mut("x")[0] = 2.0 * x + 0.5 * y - 1.0;
        system.residual_mut("y")[0] = 0.3 * x + 1.5 * y - 2.0;
        if let Some(jacobian) = system.jacobian_mut() {
            jacobian.block_mut("x", "x")[(0, 0)] = 2.5;
            jacobian.block_mut("y", "y")[(0, 0)] = 2.0;
        }
        Ok(())
    }
}

#[test]
fn acceleration_finds_the_fixed_point_sooner() {
    let plain = Config::builder(Algorithm::NewtonRaphson)
        .epsilon(1e-10)
        .build()
        .unwrap();
    let plain = integrate(Approximate, plain).into_result().unwrap();

    let accelerated = Config::builder(Algorithm::NewtonRaphson)
        .epsilon(1e-10)
        .acceleration(Acceleration {
            trigger: 3,
            period: 1,
        })
        .build()
        .unwrap();
    let integrator = integrator(Approximate, accelerated);
    let step = integrator.step();
    let mut extrapolations = 0;
    let accelerated = integrator
        .integrate(&step, |event: &Event<'_, Infallible>| {
            if matches!(event, Event::Accelerated { .. }) {
                extrapolations += 1;
            }
            None
        })
        .into_result()
        .unwrap();

    assert!(extrapolations >= 1);
    assert!(accelerated.iters < plain.iters);
    assert_relative_eq!(accelerated.increments, plain.increments, epsilon = 1e-9);
}

#[test]
fn increment_limits_cap_each_correction() {
    let config = Config::builder(Algorithm::NewtonRaphson)
        .max_increment_of("x", 0.5)
        .build()
        .unwrap();
    let solution = integrate(Target, config).into_result().unwrap();

    assert_eq!(solution.iters, 4);
    assert_relative_eq!(solution.state("x")[0], 2.0);
}

/// `R = p² − 0.25` at the end of the step, with an optional upper bound on `p`.
struct Square {
    upper: Option<f64>,
}

impl Behaviour for Square {
    type Error = Infallible;

    fn state_variables(&self) -> Vec<StateVariable> {
        let p = StateVariable::scalar("p");
        vec![match self.upper {
            Some(upper) => p.bounded_above(upper),
            None => p,
        }]
    }

    fn residual(&self, point: &Point<'_>, system: &mut System<'_>) -> Result<(), Infallible> {
        let p = point.end("p")[0];
        system.residual_mut("p")[0] = p * p - 0.25;
        if let Some(jacobian) = system.jacobian_mut() {
            jacobian.block_mut("p", "p")[(0, 0)] = 2.0 * p;
        }
        Ok(())
    }
}

fn evaluated_states(behaviour: Square) -> (Outcome, Vec<f64>) {
    let integrator = integrator(behaviour, config(Algorithm::NewtonRaphson));
    let mut step = integrator.step();
    step.set_state("p", &[0.1]);

    let mut seen = Vec::new();
    let outcome = integrator.integrate(&step, |event: &Event<'_, Infallible>| {
        if let Event::Evaluated { unknowns, .. } = event {
            seen.push(0.1 + unknowns[0]);
        }
        None
    });
    (outcome, seen)
}

#[test]
fn physical_bounds_hold_at_every_evaluation() {
    // From p = 0.1 the first Newton step overshoots to p = 1.3.
    let (outcome, seen) = evaluated_states(Square { upper: None });
    assert!(outcome.is_converged());
    assert!(seen.iter().any(|p| *p > 1.0));

    let (outcome, seen) = evaluated_states(Square { upper: Some(1.0) });
    let solution = outcome.into_result().unwrap();
    assert!(seen.iter().all(|p| *p <= 1.0 + 1e-12));
    assert_relative_eq!(solution.state("p")[0], 0.5, epsilon = 1e-10);
}

#[derive(Debug, thiserror::Error)]
#[error("p = {0} is out of range")]
struct OutOfRange(f64);

/// `R = p² − 0.81` from `p = 0.1`, undefined above `p = 1`.
struct Fragile;

impl Behaviour for Fragile {
    type Error = OutOfRange;

    fn state_variables(&self) -> Vec<StateVariable> {
        vec![StateVariable::scalar("p")]
    }

    fn residual(&self, point: &Point<'_>, system: &mut System<'_>) -> Result<(), OutOfRange> {
        let p = point.end("p")[0];
        if p > 1.0 {
            return Err(OutOfRange(p));
        }
        system.residual_mut("p")[0] = p * p - 0.81;
        if let Some(jacobian) = system.jacobian_mut() {
            jacobian.block_mut("p", "p")[(0, 0)] = 2.0 * p;
        }
        Ok(())
    }
}

#[test]
fn failed_evaluations_halve_the_last_update() {
    let integrator = integrator(Fragile, config(Algorithm::NewtonRaphson));
    let mut step = integrator.step();
    step.set_state("p", &[0.1]);

    // The first correction reaches p = 4.1, then 2.1 and 1.1 after halving.
    let mut rejected = Vec::new();
    let solution = integrator
        .integrate(&step, |event: &Event<'_, OutOfRange>| {
            if let Event::BehaviourFailed { iter, error, .. } = event {
                rejected.push((*iter, error.0));
            }
            None
        })
        .into_result()
        .unwrap();

    assert_eq!(rejected.len(), 3);
    for ((iter, p), expected) in rejected.iter().zip([(1, 4.1), (2, 2.1), (3, 1.1)]) {
        assert_eq!(*iter, expected.0);
        assert_relative_eq!(*p, expected.1, epsilon = 1e-12);
    }
    assert_relative_eq!(solution.state("p")[0], 0.9, epsilon = 1e-10);
}

#[test]
fn first_evaluation_failures_are_fatal() {
    struct Broken;
    impl Behaviour for Broken {
        type Error = OutOfRange;
        fn state_variables(&self) -> Vec<StateVariable> {
            vec![StateVariable::scalar("p")]
        }
        fn residual(&self, _point: &Point<'_>, _system: &mut System<'_>) -> Result<(), OutOfRange> {
            Err(OutOfRange(f64::NAN))
        }
    }

    struct NotANumber;
    impl Behaviour for NotANumber {
        type Error = Infallible;
        fn state_variables(&self) -> Vec<StateVariable> {
            vec![StateVariable::scalar("p")]
        }
        fn residual(&self, _point: &Point<'_>, system: &mut System<'_>) -> Result<(), Infallible> {
            system.residual_mut("p")[0] = f64::NAN;
            Ok(())
        }
    }

    let outcome = integrate(Broken, config(Algorithm::NewtonRaphson));
    assert!(matches!(
        outcome,
        Outcome::Failed(Failure {
            reason: FailureReason::Behaviour(_),
            iters: 0
        })
    ));

    let outcome = integrate(NotANumber, config(Algorithm::Broyden));
    assert!(matches!(
        outcome,
        Outcome::Failed(Failure {
            reason: FailureReason::NonFiniteResidual,
            iters: 0
        })
    ));
}

/// `R = Δx − 2` with an analytic Jacobian of 1.5 instead of 1.
struct Sloppy;

impl Behaviour for Sloppy {
    type Error = Infallible;

    fn state_variables(&self) -> Vec<StateVariable> {
        vec![StateVariable::scalar("x")]
    }

    fn residual(&self, point: &Point<'_>, system: &mut System<'_>) -> Result<(), Infallible> {
        system.residual_mut("x")[0] = point.increment("x")[0] - 2.0;
        if let Some(jacobian) = system.jacobian_mut() {
            jacobian.block_mut("x", "x")[(0, 0)] = 1.5;
        }
        Ok(())
    }
}

#[test]
fn jacobian_mismatches_are_reported_without_failing() {
    let config = Config::builder(Algorithm::NewtonRaphson)
        .compare_to_numerical_jacobian(Some(1e-6))
        .numerical_jacobian_epsilon(1e-6)
        .build()
        .unwrap();
    let integrator = integrator(Sloppy, config);
    let step = integrator.step();

    let mut mismatches: Vec<JacobianMismatch> = Vec::new();
    let outcome = integrator.integrate(&step, |event: &Event<'_, Infallible>| {
        if let Event::JacobianMismatch { mismatches: found, .. } = event {
            mismatches.extend(found.iter().cloned());
        }
        None
    });

    assert!(outcome.is_converged());
    assert!(!mismatches.is_empty());
    assert!(mismatches.iter().all(|m| m.row == "x" && m.col == "x"));
    assert_relative_eq!(mismatches[0].max_difference, 0.5, epsilon = 1e-6);
}

#[test]
fn observer_can_stop_early() {
    let integrator = integrator(Target, Config::default());
    let step = integrator.step();
    let outcome = integrator.integrate(&step, |_: &Event<'_, Infallible>| Some(Action::StopEarly));

    assert!(matches!(
        outcome,
        Outcome::Failed(Failure {
            reason: FailureReason::StoppedByObserver,
            iters: 0
        })
    ));
}

/// Rosenbrock's function written as residuals, with its root at `(1, 1)`.
struct Rosenbrock;

impl Behaviour for Rosenbrock {
    type Error = Infallible;

    fn state_variables(&self) -> Vec<StateVariable> {
        vec![StateVariable::scalar("x"), StateVariable::scalar("y")]
    }

    fn residual(&self, point: &Point<'_>, system: &mut System<'_>) -> Result<(), Infallible> {
        let x = point.increment("x")[0];
        let y = point.increment("y")[0];
        system.residual_mut("x")[0] = 10.0 * (y - x * x);
        system.residual_mut("y")[0] = 1.0 - x;
        if let Some(jacobian) = system.jacobian_mut() {
            jacobian.block_mut("x", "x")[(0, 0)] = -20.0 * x;
            jacobian.block_mut("x", "y")[(0, 0)] = 10.0;
            jacobian.block_mut("y", "x")[(0, 0)] = -1.0;
            jacobian.block_mut("y", "y")[(0, 0)] = 0.0;
        }
        Ok(())
    }
}

#[test]
fn levenberg_marquardt_recovers_from_rejected_trials() {
    let config = Config::builder(Algorithm::LevenbergMarquardt)
        .epsilon(1e-10)
        .max_iters(500)
        .build()
        .unwrap();
    let solution = integrate(Rosenbrock, config).into_result().unwrap();

    assert_relative_eq!(solution.increment("x")[0], 1.0, epsilon = 1e-8);
    assert_relative_eq!(solution.increment("y")[0], 1.0, epsilon = 1e-8);
}

/// `R = 2·Δx − Δe`, driven by the scalar `e`.
struct Spring;

impl Behaviour for Spring {
    type Error = Infallible;

    fn state_variables(&self) -> Vec<StateVariable> {
        vec![StateVariable::scalar("x").normalized(10.0)]
    }

    fn driving_variables(&self) -> Vec<Variable> {
        vec![Variable::scalar("e")]
    }

    fn residual(&self, point: &Point<'_>, system: &mut System<'_>) -> Result<(), Infallible> {
        let x = point.increment("x")[0];
        let e = point.driving_increment("e")[0];
        system.residual_mut("x")[0] = 2.0 * x - e;
        if let Some(jacobian) = system.jacobian_mut() {
            jacobian.block_mut("x", "x")[(0, 0)] = 2.0;
        }
        Ok(())
    }

    fn tangent_operator(
        &self,
        _point: &Point<'_>,
        sensitivities: &Sensitivities,
    ) -> Result<Option<DMatrix<f64>>, Infallible> {
        // ∂R/∂Δe = −1, so ∂Δx/∂Δe = J⁻¹.
        Ok(sensitivities.block("x", "x").map(|block| block.clone_owned()))
    }
}

#[test]
fn consistent_tangent_for_every_algorithm() {
    for algorithm in [
        Algorithm::NewtonRaphson,
        Algorithm::NewtonRaphsonNumericalJacobian,
        Algorithm::Broyden,
        Algorithm::Broyden2,
        Algorithm::LevenbergMarquardt,
        Algorithm::LevenbergMarquardtNumericalJacobian,
    ] {
        let config = Config::builder(algorithm)
            .epsilon(1e-10)
            .numerical_jacobian_epsilon(1e-7)
            .sensitivity("x")
            .build()
            .unwrap();
        let integrator = integrator(Spring, config);
        let mut step = integrator
            .step()
            .with_stiffness(StiffnessRequest::ConsistentTangent);
        step.set_driving_increment("e", &[0.4]);

        let solution = integrator
            .integrate_unobserved(&step)
            .into_result()
            .unwrap_or_else(|failure| panic!("{algorithm} failed: {failure}"));

        assert_relative_eq!(solution.increment("x")[0], 0.2, epsilon = 1e-8);
        let sensitivities = solution.sensitivities.as_ref().unwrap();
        assert_relative_eq!(sensitivities.block("x", "x").unwrap()[(0, 0)], 0.5, epsilon = 1e-8);
        let tangent = solution.tangent_operator.as_ref().unwrap();
        assert_relative_eq!(tangent[(0, 0)], 0.5, epsilon = 1e-8);
    }
}

/// `R = Δx − 2` with a zero initial Jacobian.
struct ZeroSeed;

impl Behaviour for ZeroSeed {
    type Error = Infallible;

    fn state_variables(&self) -> Vec<StateVariable> {
        vec![StateVariable::scalar("x")]
    }

    fn residual(&self, point: &Point<'_>, system: &mut System<'_>) -> Result<(), Infallible> {
        Target.residual(point, system)
    }

    fn initial_jacobian(
        &self,
        _point: &Point<'_>,
        jacobian: &mut JacobianBlocks<'_>,
    ) -> Result<(), Infallible> {
        jacobian.block_mut("x", "x").fill(0.0);
        Ok(())
    }
}

#[test]
fn singular_initial_jacobian_stops_quasi_newton() {
    for algorithm in [Algorithm::Broyden, Algorithm::Broyden2] {
        let outcome = integrate(ZeroSeed, config(algorithm));
        assert!(matches!(
            outcome,
            Outcome::Failed(Failure {
                reason: FailureReason::SingularJacobian,
                iters: 0
            })
        ));
    }
}

#[test]
fn setup_rejects_unknown_or_invalid_variables() {
    let config = Config::builder(Algorithm::NewtonRaphson)
        .sensitivity("nope")
        .build()
        .unwrap();
    let error = Integrator::new(Target, Hypothesis::Tridimensional, config)
        .err()
        .unwrap();
    assert_eq!(
        error,
        Error::UnknownVariable {
            name: "nope".into(),
            context: "sensitivities",
        }
    );

    struct Twice;
    impl Behaviour for Twice {
        type Error = Infallible;
        fn state_variables(&self) -> Vec<StateVariable> {
            vec![StateVariable::scalar("x"), StateVariable::stensor("x")]
        }
        fn residual(&self, _point: &Point<'_>, _system: &mut System<'_>) -> Result<(), Infallible> {
            Ok(())
        }
    }

    let error = Integrator::new(Twice, Hypothesis::PlaneStrain, Config::default())
        .err()
        .unwrap();
    assert_eq!(error, Error::Layout(LayoutError::Duplicate("x".into())));
}
