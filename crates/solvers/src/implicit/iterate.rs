use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use ravel_core::{Behaviour, Observer, Step};

use super::{
    Action, Algorithm, BroydenSeed, Config, Event, Failure, FailureReason, Integrator, Outcome,
    Solution, TangentJacobian,
    acceleration::Accelerator,
    evaluate::{EvalError, Evaluator},
    numerical,
    relaxation::relax,
    secant,
    state::IterationState,
    tangent,
};

/// Newton-Raphson and Broyden iterations.
pub(super) fn iterate<B, Obs>(integrator: &Integrator<B>, step: &Step, observer: &mut Obs) -> Outcome
where
    B: Behaviour,
    Obs: for<'a> Observer<Event<'a, B::Error>, Action>,
{
    let config = &integrator.config;
    let algorithm = config.algorithm();
    let mut evaluator = evaluator_for(integrator, step);
    let n = evaluator.len();
    let accelerator = config
        .acceleration()
        .map(|settings| Accelerator::new(settings, n));
    let mut state = IterationState::new(n, accelerator);

    if algorithm.is_quasi_newton() {
        if let Err(reason) = seed(&mut evaluator, &mut state, config) {
            return failed(reason, 0);
        }
    }

    loop {
        if let Err(error) = evaluate(&mut evaluator, &mut state, algorithm) {
            if let Some(Action::StopEarly) = report(observer, state.iter, &state.unknowns, &error) {
                return failed(FailureReason::StoppedByObserver, state.iter);
            }
            if state.iter == config.max_iters() || !state.halve_last_update() {
                return failed(error.into_reason(), state.iter);
            }
            state.iter += 1;
            log::debug!(
                "iteration {}: evaluation rejected ({}), halving the last update",
                state.iter,
                error.into_reason()
            );
            continue;
        }

        let residual_norm = state.residual_norm();
        log::debug!("iteration {}: residual norm {residual_norm:e}", state.iter);

        let event = Event::Evaluated {
            iter: state.iter,
            unknowns: &state.unknowns,
            residual: &state.residual,
            residual_norm,
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            return failed(FailureReason::StoppedByObserver, state.iter);
        }

        if residual_norm < config.epsilon() {
            return converge(integrator, &mut evaluator, &mut state, step);
        }
        if state.iter == config.max_iters() {
            return failed(FailureReason::MaxIters, state.iter);
        }

        if let Some(criterion) = config.jacobian_check() {
            if let Some(Action::StopEarly) =
                check_jacobian(integrator, &mut evaluator, &mut state, criterion, observer)
            {
                return failed(FailureReason::StoppedByObserver, state.iter);
            }
        }

        if let Err(reason) = correct(&mut evaluator, &mut state, config) {
            return failed(reason, state.iter);
        }
        state.iter += 1;
        let iter = state.iter;
        log::trace!("iteration {iter}: correction norm {:e}", state.correction.norm());

        state.save_previous();
        integrator.limiter.limit(&mut state.correction);
        state.unknowns += &state.correction;

        if let Some(accelerator) = &mut state.accelerator {
            accelerator.record(iter, &state.unknowns, &state.correction);
            if accelerator.is_due(iter) {
                if let Some(accelerated) = accelerator.extrapolate() {
                    log::debug!("iteration {iter}: unknowns extrapolated");
                    state.unknowns = accelerated;
                    let event = Event::Accelerated {
                        iter,
                        unknowns: &state.unknowns,
                    };
                    if let Some(Action::StopEarly) = observer.observe(&event) {
                        return failed(FailureReason::StoppedByObserver, iter);
                    }
                }
            }
        }

        if let (Some(settings), Some(previous)) = (config.relaxation(), &state.previous) {
            relax(settings, iter, &mut state.unknowns, &previous.unknowns);
        }

        integrator.limiter.clamp_to_bounds(&mut state.unknowns, step.state());
    }
}

pub(super) fn evaluator_for<'a, B: Behaviour>(
    integrator: &'a Integrator<B>,
    step: &'a Step,
) -> Evaluator<'a, B> {
    Evaluator::new(
        &integrator.behaviour,
        &integrator.layout,
        &integrator.scales,
        step,
        integrator.config.theta(),
        integrator.config.missing_diagonal(),
    )
}

pub(super) fn failed(reason: FailureReason, iters: usize) -> Outcome {
    log::debug!("integration failed after {iters} iterations: {reason}");
    Outcome::Failed(Failure { reason, iters })
}

/// Emits the event matching a rejected evaluation.
pub(super) fn report<E, Obs>(
    observer: &mut Obs,
    iter: usize,
    unknowns: &DVector<f64>,
    error: &EvalError<E>,
) -> Option<Action>
where
    Obs: for<'a> Observer<Event<'a, E>, Action>,
{
    let event = match error {
        EvalError::Behaviour(error) => Event::BehaviourFailed {
            iter,
            unknowns,
            error,
        },
        EvalError::NonFinite => Event::NonFiniteResidual { iter, unknowns },
    };
    observer.observe(&event)
}

/// Prepares the Broyden matrix at the initial point.
fn seed<B: Behaviour>(
    evaluator: &mut Evaluator<'_, B>,
    state: &mut IterationState,
    config: &Config,
) -> Result<(), FailureReason> {
    match config.broyden_seed() {
        BroydenSeed::Identity => evaluator
            .initial_jacobian(&state.unknowns, &mut state.matrix)
            .map_err(FailureReason::behaviour)?,
        BroydenSeed::Numerical => numerical::estimate(
            evaluator,
            &mut state.unknowns,
            config.numerical_jacobian_epsilon(),
            &mut state.matrix,
        )
        .map_err(EvalError::into_reason)?,
    }

    if config.algorithm() == Algorithm::Broyden2 {
        state.matrix = state
            .matrix
            .clone()
            .lu()
            .try_inverse()
            .ok_or(FailureReason::SingularJacobian)?;
    }
    Ok(())
}

fn evaluate<B: Behaviour>(
    evaluator: &mut Evaluator<'_, B>,
    state: &mut IterationState,
    algorithm: Algorithm,
) -> Result<(), EvalError<B::Error>> {
    if algorithm == Algorithm::NewtonRaphson {
        evaluator.residual_and_jacobian(&state.unknowns, &mut state.residual, &mut state.matrix)
    } else {
        evaluator.residual(&state.unknowns, &mut state.residual)
    }
}

/// Compares the analytic Jacobian to finite differences and reports mismatches.
fn check_jacobian<B, Obs>(
    integrator: &Integrator<B>,
    evaluator: &mut Evaluator<'_, B>,
    state: &mut IterationState,
    criterion: f64,
    observer: &mut Obs,
) -> Option<Action>
where
    B: Behaviour,
    Obs: for<'a> Observer<Event<'a, B::Error>, Action>,
{
    let n = state.unknowns.len();
    let mut estimate = DMatrix::zeros(n, n);
    if let Err(error) = numerical::estimate(
        evaluator,
        &mut state.unknowns,
        integrator.config.numerical_jacobian_epsilon(),
        &mut estimate,
    ) {
        log::warn!(
            "iteration {}: jacobian check skipped ({})",
            state.iter,
            error.into_reason()
        );
        return None;
    }

    let mismatches = numerical::compare(&integrator.layout, &state.matrix, &estimate, criterion);
    if mismatches.is_empty() {
        return None;
    }
    for mismatch in &mismatches {
        log::warn!(
            "iteration {}: jacobian block ({}, {}) is off by {:e} (tolerance {:e})",
            state.iter,
            mismatch.row,
            mismatch.col,
            mismatch.max_difference,
            mismatch.tolerance
        );
    }
    observer.observe(&Event::JacobianMismatch {
        iter: state.iter,
        mismatches: &mismatches,
    })
}

/// Writes the next correction into `state.correction`.
fn correct<B: Behaviour>(
    evaluator: &mut Evaluator<'_, B>,
    state: &mut IterationState,
    config: &Config,
) -> Result<(), FailureReason> {
    match config.algorithm() {
        Algorithm::NewtonRaphson => {}
        Algorithm::NewtonRaphsonNumericalJacobian => {
            if state.iter % config.jacobian_update_period() == 0 {
                numerical::estimate(
                    evaluator,
                    &mut state.unknowns,
                    config.numerical_jacobian_epsilon(),
                    &mut state.matrix,
                )
                .map_err(EvalError::into_reason)?;
            }
        }
        Algorithm::Broyden => {
            if let Some(previous) = &state.previous {
                let step = &state.unknowns - &previous.unknowns;
                let change = &state.residual - &previous.residual;
                let floor = secant::noise_floor(&state.unknowns);
                secant::update_jacobian(&mut state.matrix, &step, &change, floor)
                    .map_err(|_| FailureReason::DegenerateSecant)?;
            }
        }
        Algorithm::Broyden2 => {
            if let Some(previous) = &state.previous {
                let step = &state.unknowns - &previous.unknowns;
                let change = &state.residual - &previous.residual;
                let floor = secant::noise_floor(&state.unknowns);
                secant::update_inverse(&mut state.matrix, &step, &change, floor)
                    .map_err(|_| FailureReason::DegenerateSecant)?;
            }
            state.matrix.mul_to(&state.residual, &mut state.correction);
            state.correction.neg_mut();
            return finite(&state.correction);
        }
        Algorithm::LevenbergMarquardt | Algorithm::LevenbergMarquardtNumericalJacobian => {
            unreachable!("Levenberg-Marquardt runs its own loop")
        }
    }

    solve(&state.matrix, &state.residual, &mut state.correction)
}

/// Solves `J·δ = −R` by LU decomposition.
pub(super) fn solve(
    jacobian: &DMatrix<f64>,
    residual: &DVector<f64>,
    correction: &mut DVector<f64>,
) -> Result<(), FailureReason> {
    let solution = jacobian
        .clone()
        .lu()
        .solve(&-residual)
        .ok_or(FailureReason::SingularJacobian)?;
    correction.copy_from(&solution);
    finite(correction)
}

fn finite(correction: &DVector<f64>) -> Result<(), FailureReason> {
    if correction.iter().all(|value| value.is_finite()) {
        Ok(())
    } else {
        Err(FailureReason::SingularJacobian)
    }
}

/// Publishes the converged point, with the tangent if one was requested.
pub(super) fn converge<B: Behaviour>(
    integrator: &Integrator<B>,
    evaluator: &mut Evaluator<'_, B>,
    state: &mut IterationState,
    step: &Step,
) -> Outcome {
    let mut solution = Solution::new(
        Arc::clone(&integrator.layout),
        state.unknowns.clone(),
        &integrator.scales,
        step.state(),
        state.iter,
        state.residual_norm(),
    );

    if step.stiffness().is_requested() {
        if let Err(reason) = attach_tangent(integrator, evaluator, state, &mut solution) {
            return failed(reason, state.iter);
        }
    }

    log::debug!(
        "converged after {} iterations, residual norm {:e}",
        solution.iters,
        solution.residual_norm
    );
    Outcome::Converged(solution)
}

fn attach_tangent<B: Behaviour>(
    integrator: &Integrator<B>,
    evaluator: &mut Evaluator<'_, B>,
    state: &mut IterationState,
    solution: &mut Solution,
) -> Result<(), FailureReason> {
    let config = &integrator.config;
    let algorithm = config.algorithm();
    let n = state.unknowns.len();

    let jacobian = if algorithm.uses_numerical_jacobian()
        || config.tangent_jacobian() == TangentJacobian::Numerical
    {
        let mut jacobian = DMatrix::zeros(n, n);
        numerical::estimate(
            evaluator,
            &mut state.unknowns,
            config.numerical_jacobian_epsilon(),
            &mut jacobian,
        )
        .map_err(EvalError::into_reason)?;
        jacobian
    } else if algorithm.is_quasi_newton() {
        let mut residual = DVector::zeros(n);
        let mut jacobian = DMatrix::zeros(n, n);
        evaluator
            .residual_and_jacobian(&state.unknowns, &mut residual, &mut jacobian)
            .map_err(EvalError::into_reason)?;
        jacobian
    } else {
        state.matrix.clone()
    };

    let sensitivities = tangent::extract(
        &integrator.layout,
        &integrator.scales,
        jacobian,
        config.sensitivities(),
    )
    .ok_or(FailureReason::SingularJacobian)?;

    let operator = evaluator
        .with_point(&state.unknowns, |behaviour, point| {
            behaviour.tangent_operator(point, &sensitivities)
        })
        .map_err(FailureReason::behaviour)?;

    solution.sensitivities = Some(sensitivities);
    solution.tangent_operator = operator;
    Ok(())
}
