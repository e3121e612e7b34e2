//! Run controller (spec.md §4.6): drives the iteration/invocation loop,
//! wiring the generator, the two invocation strategies, the verifier, and
//! the minimizer together.

use std::time::{Duration, Instant};

use crate::error::Error;
use crate::failure::Failure;
use crate::generator::{ExecutionGenerator, GeneratorParams};
use crate::model::actor::Actor;
use crate::model::result::ActorResult;
use crate::model::scenario::Scenario;
use crate::oracle::SequentialOracle;
use crate::run::minimizer::{minimize, MinimizerBudget};
use crate::run::stats::RunStats;
use crate::run::tracker::RunTracker;
use crate::strategy::event::TraceEvent;
use crate::strategy::managed::ManagedStrategy;
use crate::strategy::stress::StressStrategy;
use crate::strategy::InvocationOutcome;
use crate::verifier::{LinearizabilityVerifier, VerificationOutcome};
use crate::CheckedType;

/// How a single iteration's invocations are driven (spec.md §4.6 "choose a
/// strategy"). Iterations alternate deterministically so that both
/// real-thread and model-checked exploration get coverage across a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrategyChoice {
    Stress,
    Managed,
}

fn choice_for_iteration(iteration: u32) -> StrategyChoice {
    if iteration % 2 == 0 {
        StrategyChoice::Stress
    } else {
        StrategyChoice::Managed
    }
}

/// What the checker concluded after running to completion or finding a
/// failure.
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    /// Every iteration's invocations verified as linearizable.
    Success,
    /// A failure was found (and, if configured, minimized).
    Failed(Failure),
    /// The run aborted on an infrastructure or declaration error before a
    /// verdict could be reached.
    Aborted(String),
}

/// The result of a full checker run.
#[derive(Debug, Clone)]
pub struct CheckReport {
    /// How many iterations actually ran (fewer than configured if a failure
    /// or abort ended the run early).
    pub iterations_run: u32,
    /// Accumulated statistics across those iterations (spec.md §8 property 7).
    pub stats: RunStats,
    /// The verdict.
    pub outcome: CheckOutcome,
}

impl CheckReport {
    /// Whether the run found no failure and did not abort.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CheckOutcome::Success)
    }

    /// The failure, if the run found one.
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match &self.outcome {
            CheckOutcome::Failed(failure) => Some(failure),
            CheckOutcome::Success | CheckOutcome::Aborted(_) => None,
        }
    }
}

impl std::fmt::Display for CheckReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            CheckOutcome::Success => write!(
                f,
                "actorcheck: {} iterations passed ({} invocations)",
                self.iterations_run,
                self.stats.total_invocations_count()
            ),
            CheckOutcome::Failed(failure) => {
                write!(f, "actorcheck: failed after {} iterations\n{}", self.iterations_run, failure.render())
            }
            CheckOutcome::Aborted(message) => {
                write!(f, "actorcheck: aborted after {} iterations: {message}", self.iterations_run)
            }
        }
    }
}

/// An invocation's classification, before it is attached to a scenario and
/// trace to become a [`Failure`].
enum RawFailure {
    IncorrectResults {
        execution: crate::model::execution::ExecutionResult,
        closest_path: Vec<crate::verifier::LinearizationStep>,
    },
    DeadlockOrLivelock {
        thread_dump: crate::strategy::ThreadDump,
    },
    ObstructionFreedomViolation {
        reason: String,
    },
    UnexpectedException {
        message: String,
    },
    ValidationFailure {
        execution: crate::model::execution::ExecutionResult,
    },
}

/// Attaches `T`'s validation actor (spec.md §3 "Scenario") to a
/// freshly generated scenario, if [`CheckedType::validation`] supplies one.
/// [`ExecutionGenerator::generate`] never attaches one itself, since
/// validation is a property of the checked type, not of the random draw.
fn attach_validation<T: CheckedType>(scenario: Scenario, next_actor_id: usize) -> Result<Scenario, Error> {
    let Some(template) = T::validation() else { return Ok(scenario) };
    let validation = Actor::from_template(next_actor_id, &template, Vec::new());
    Ok(Scenario::new(scenario.init, scenario.parallel, scenario.post, Some(validation))?)
}

fn to_failure(raw: RawFailure, scenario: &Scenario, trace: Option<Vec<TraceEvent>>) -> Failure {
    match raw {
        RawFailure::IncorrectResults { execution, closest_path } => {
            Failure::IncorrectResults { scenario: scenario.clone(), execution, closest_path, trace }
        }
        RawFailure::DeadlockOrLivelock { thread_dump } => {
            Failure::DeadlockOrLivelock { scenario: scenario.clone(), thread_dump, trace }
        }
        RawFailure::ObstructionFreedomViolation { reason } => {
            Failure::ObstructionFreedomViolation { scenario: scenario.clone(), reason, trace }
        }
        RawFailure::UnexpectedException { message } => {
            Failure::UnexpectedException { scenario: scenario.clone(), message, trace }
        }
        RawFailure::ValidationFailure { execution } => {
            Failure::ValidationFailure { scenario: scenario.clone(), execution, trace }
        }
    }
}

/// Classifies a single invocation's outcome: `Ok(None)` means it verified
/// cleanly, `Ok(Some(_))` carries the failure it produced, and `Err`
/// propagates a genuine infrastructure error (spec.md §4.3 "Internal
/// exceptions from the oracle... are fatal").
fn classify<T: Clone + PartialEq>(
    outcome: InvocationOutcome,
    oracle: &SequentialOracle<T>,
    scenario: &Scenario,
    verifier: &LinearizabilityVerifier<T>,
) -> Result<Option<RawFailure>, Error> {
    match outcome {
        InvocationOutcome::Deadlock(thread_dump) => Ok(Some(RawFailure::DeadlockOrLivelock { thread_dump })),
        InvocationOutcome::UnexpectedException(message) => {
            Ok(Some(RawFailure::UnexpectedException { message }))
        }
        InvocationOutcome::SpecViolation(reason) => {
            Ok(Some(RawFailure::ObstructionFreedomViolation { reason }))
        }
        InvocationOutcome::Completed(execution) => {
            if let Some(validation) = &execution.validation_result {
                if matches!(validation.result, ActorResult::Exception(_)) {
                    return Ok(Some(RawFailure::ValidationFailure { execution }));
                }
            }
            match verifier.verify(oracle, scenario, &execution)? {
                VerificationOutcome::Valid => Ok(None),
                VerificationOutcome::Invalid { closest_path } => {
                    Ok(Some(RawFailure::IncorrectResults { execution, closest_path }))
                }
            }
        }
    }
}

/// Re-runs `scenario` for up to `rerun_budget` invocations, returning the
/// first failure it reproduces, if any (spec.md §4.6 "the minimizer re-runs
/// the candidate with a small invocation budget").
#[allow(clippy::too_many_arguments)]
fn still_fails<T: CheckedType>(
    scenario: &Scenario,
    choice: StrategyChoice,
    oracle: &SequentialOracle<T>,
    verifier: &LinearizabilityVerifier<T>,
    stress: &StressStrategy,
    managed: &ManagedStrategy,
    run_seed: u64,
    rerun_budget: u32,
) -> Option<RawFailure> {
    for invocation in 0..rerun_budget {
        let raw = match choice {
            StrategyChoice::Stress => {
                let instance = T::new_instance();
                let (outcome, _instance) =
                    stress.run_invocation(scenario, oracle, instance, run_seed, u64::from(invocation));
                classify(outcome, oracle, scenario, verifier)
            }
            StrategyChoice::Managed => {
                let mut instance = T::new_instance();
                let (outcome, _trace) =
                    managed.run_invocation(scenario, oracle, &mut instance, run_seed, u64::from(invocation));
                classify(outcome, oracle, scenario, verifier)
            }
        };
        if let Ok(Some(raw_failure)) = raw {
            return Some(raw_failure);
        }
    }
    None
}

#[allow(clippy::too_many_arguments)]
fn minimize_failure<T: CheckedType>(
    original: Failure,
    choice: StrategyChoice,
    oracle: &SequentialOracle<T>,
    verifier: &LinearizabilityVerifier<T>,
    stress: &StressStrategy,
    managed: &ManagedStrategy,
    run_seed: u64,
) -> Failure {
    const RERUN_BUDGET: u32 = 8;
    let scenario = original.scenario().clone();

    let reduced_scenario = minimize(scenario, MinimizerBudget::default(), |candidate| {
        still_fails(candidate, choice, oracle, verifier, stress, managed, run_seed, RERUN_BUDGET).is_some()
    });

    match still_fails(&reduced_scenario, choice, oracle, verifier, stress, managed, run_seed, RERUN_BUDGET) {
        Some(raw) => {
            let trace = match choice {
                StrategyChoice::Managed => {
                    let mut instance = T::new_instance();
                    let (_, trace) = managed.run_invocation(&reduced_scenario, oracle, &mut instance, run_seed, 0);
                    Some(trace)
                }
                StrategyChoice::Stress => None,
            };
            to_failure(raw, &reduced_scenario, trace)
        }
        None => original,
    }
}

/// Runs a complete check of `T`, iterating per `config` and seeding every
/// random choice from `run_seed` (spec.md §8 property 2, property 8).
///
/// # Errors
///
/// Returns [`Error`] if scenario generation or oracle dispatch hits a
/// genuine infrastructure problem rather than a test failure.
pub fn run<T: CheckedType>(
    config: &crate::config::CheckerConfig,
    run_seed: u64,
    tracker: &dyn RunTracker,
) -> Result<CheckReport, Error> {
    let generator = ExecutionGenerator::new(T::operations());
    let oracle = T::oracle();
    let verifier = LinearizabilityVerifier::new(T::new_instance);
    let stress = StressStrategy { timeout: Duration::from_millis(config.timeout_ms) };
    let managed = ManagedStrategy {
        check_obstruction_freedom: config.check_obstruction_freedom,
        hanging_detection_threshold: config.hanging_detection_threshold,
    };

    let gen_params = GeneratorParams {
        threads: config.threads,
        actors_per_thread: config.actors_per_thread,
        actors_before: config.actors_before,
        actors_after: config.actors_after,
    };
    let warm_up = (config.invocations_per_iteration / 10).max(1);

    let mut stats = RunStats::default();

    for iteration in 0..config.iterations {
        tracker.iteration_start(iteration);

        let scenario = if let Some(custom) = config.custom_scenarios.get(iteration as usize) {
            custom.clone()
        } else {
            let generated = generator.generate(gen_params, run_seed ^ u64::from(iteration))?;
            let next_id = generated.all_actors().count();
            attach_validation::<T>(generated, next_id)?
        };

        let choice = choice_for_iteration(iteration);

        let mut managed_instance = T::new_instance();
        let managed_baseline = managed_instance.snapshot();

        let mut found: Option<Failure> = None;

        for invocation in 0..config.invocations_per_iteration {
            tracker.invocation_start(iteration, invocation);
            let started = Instant::now();
            let is_warm_up = invocation < warm_up;

            let (raw, trace) = match choice {
                StrategyChoice::Stress => {
                    let instance = T::new_instance();
                    let (outcome, _instance) = stress.run_invocation(
                        &scenario,
                        &oracle,
                        instance,
                        run_seed,
                        u64::from(invocation),
                    );
                    (classify(outcome, &oracle, &scenario, &verifier)?, None)
                }
                StrategyChoice::Managed => {
                    managed_instance.restore(managed_baseline.clone());
                    let (outcome, trace) = managed.run_invocation(
                        &scenario,
                        &oracle,
                        &mut managed_instance,
                        run_seed,
                        u64::from(invocation),
                    );
                    (classify(outcome, &oracle, &scenario, &verifier)?, Some(trace))
                }
            };

            let elapsed = started.elapsed();
            stats.record_invocation(iteration as usize, is_warm_up, elapsed.as_nanos() as u64);
            tracker.invocation_end(iteration, invocation);

            if let Some(raw_failure) = raw {
                found = Some(to_failure(raw_failure, &scenario, trace));
                break;
            }
        }

        tracker.iteration_end(iteration);

        if let Some(failure) = found {
            let failure = if config.minimize_failed_scenario {
                minimize_failure(failure, choice, &oracle, &verifier, &stress, &managed, run_seed)
            } else {
                failure
            };
            return Ok(CheckReport {
                iterations_run: iteration + 1,
                stats,
                outcome: CheckOutcome::Failed(failure),
            });
        }
    }

    Ok(CheckReport { iterations_run: config.iterations, stats, outcome: CheckOutcome::Success })
}
