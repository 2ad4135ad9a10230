//! Damped Gauss-Newton iterations.
//!
//! Each iteration solves `(JᵀJ + μ·‖R‖·I)·s = −JᵀR` and tries `z + s`. The
//! gain ratio between the actual and the linearly predicted decrease of
//! `‖R‖²` decides whether the trial point is accepted and how `μ` evolves.
//! Rejected trials still count as iterations.

use nalgebra::{DMatrix, DVector};
use ravel_core::{Behaviour, Observer, Step};

use super::{
    Action, Algorithm, Config, Event, FailureReason, Integrator, Outcome,
    evaluate::{EvalError, Evaluator},
    iterate::{converge, evaluator_for, failed, report},
    numerical,
    state::IterationState,
};

pub(super) fn iterate<B, Obs>(integrator: &Integrator<B>, step: &Step, observer: &mut Obs) -> Outcome
where
    B: Behaviour,
    Obs: for<'a> Observer<Event<'a, B::Error>, Action>,
{
    let config = &integrator.config;
    let parameters = config.levenberg_marquardt();
    let mut evaluator = evaluator_for(integrator, step);
    let n = evaluator.len();
    let mut state = IterationState::new(n, None);
    let mut trial = DVector::zeros(n);
    let mut trial_residual = DVector::zeros(n);
    let mut damping = parameters.mu0;

    if let Err(error) = linearize(&mut evaluator, &mut state, config) {
        if let Some(Action::StopEarly) = report(observer, 0, &state.unknowns, &error) {
            return failed(FailureReason::StoppedByObserver, 0);
        }
        return failed(error.into_reason(), 0);
    }

    loop {
        let residual_norm = state.residual_norm();
        log::debug!(
            "iteration {}: residual norm {residual_norm:e}, damping {damping:e}",
            state.iter
        );

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

        loop {
            if state.iter == config.max_iters() {
                return failed(FailureReason::MaxIters, state.iter);
            }
            let Some(mut correction) = damped_step(&state.matrix, &state.residual, damping) else {
                return failed(FailureReason::SingularJacobian, state.iter);
            };
            state.iter += 1;
            let iter = state.iter;

            integrator.limiter.limit(&mut correction);
            trial.copy_from(&state.unknowns);
            trial += &correction;
            integrator.limiter.clamp_to_bounds(&mut trial, step.state());
            let effective = &trial - &state.unknowns;

            if let Err(error) = evaluator.residual(&trial, &mut trial_residual) {
                if let Some(Action::StopEarly) = report(observer, iter, &trial, &error) {
                    return failed(FailureReason::StoppedByObserver, iter);
                }
                damping *= 4.0;
                log::debug!(
                    "iteration {iter}: trial rejected ({}), damping {damping:e}",
                    error.into_reason()
                );
                continue;
            }

            let current = state.residual.norm_squared();
            let predicted = (&state.residual + &state.matrix * &effective).norm_squared() - current;
            let ratio = (trial_residual.norm_squared() - current) / predicted;

            if ratio.is_nan() || ratio < parameters.p0 {
                damping *= 4.0;
                log::trace!("iteration {iter}: gain ratio {ratio:e}, trial rejected");
                continue;
            }
            if ratio < parameters.p1 {
                damping *= 4.0;
            } else if ratio > parameters.p2 {
                damping = (damping / 4.0).max(parameters.m);
            }

            log::trace!("iteration {iter}: gain ratio {ratio:e}, trial accepted");
            state.correction.copy_from(&effective);
            state.unknowns.copy_from(&trial);
            break;
        }

        if let Err(error) = linearize(&mut evaluator, &mut state, config) {
            if let Some(Action::StopEarly) = report(observer, state.iter, &state.unknowns, &error) {
                return failed(FailureReason::StoppedByObserver, state.iter);
            }
            return failed(error.into_reason(), state.iter);
        }
    }
}

/// Evaluates the residual and the Jacobian at the current unknowns.
fn linearize<B: Behaviour>(
    evaluator: &mut Evaluator<'_, B>,
    state: &mut IterationState,
    config: &Config,
) -> Result<(), EvalError<B::Error>> {
    if config.algorithm() == Algorithm::LevenbergMarquardtNumericalJacobian {
        evaluator.residual(&state.unknowns, &mut state.residual)?;
        numerical::estimate(
            evaluator,
            &mut state.unknowns,
            config.numerical_jacobian_epsilon(),
            &mut state.matrix,
        )
    } else {
        evaluator.residual_and_jacobian(&state.unknowns, &mut state.residual, &mut state.matrix)
    }
}

/// Solves the damped normal equations, or `None` if they are singular.
fn damped_step(
    jacobian: &DMatrix<f64>,
    residual: &DVector<f64>,
    damping: f64,
) -> Option<DVector<f64>> {
    let mut normal = jacobian.tr_mul(jacobian);
    let diagonal = normal.diagonal().add_scalar(damping * residual.norm());
    normal.set_diagonal(&diagonal);

    let gradient = jacobian.tr_mul(residual);
    let step = normal.lu().solve(&-gradient)?;
    step.iter().all(|value| value.is_finite()).then_some(step)
}
