//! Linearizability verifier (spec.md §4.3) — "the single most intricate
//! subsystem".
//!
//! Models a linearization search as a depth-first enumeration over a
//! labeled transition system whose states are sequential-specification
//! instances and whose transitions are actor applications (spec.md §9
//! "Coroutine-style control flow in the verifier... model it with an
//! explicit stack of `(state, thread-frontier-iterator)` frames" — realized
//! here as plain recursion rather than a hand-rolled stack, since Rust's
//! call stack already plays that role and the recursion depth is bounded by
//! the scenario's total actor count).

use crate::error::InfraError;
use crate::model::actor::Actor;
use crate::model::execution::ExecutionResult;
use crate::model::result::ActorResult;
use crate::model::scenario::Scenario;
use crate::oracle::SequentialOracle;

use super::cache::TransitionCache;

/// One step of a linearization, used to report the closest reachable path
/// when verification fails (spec.md §4.3 "the verifier returns the LTS
/// path closest to the observed prefix for use by the trace reporter").
#[derive(Debug, Clone)]
pub struct LinearizationStep {
    /// The actor this step applied.
    pub actor_id: usize,
    /// Its operation name, for human-readable rendering.
    pub operation: String,
    /// Whether this step resumed a previously suspended actor rather than
    /// firing it for the first time.
    pub is_resumption: bool,
}

/// The result of one verification run (spec.md §4.3 "Result").
#[derive(Debug, Clone)]
pub enum VerificationOutcome {
    /// Some interleaving of the observed actors, replayed sequentially,
    /// reproduces every observed result exactly.
    Valid,
    /// No such interleaving exists; `closest_path` is the longest prefix
    /// the DFS managed to match before every continuation dead-ended.
    Invalid {
        /// Longest matching prefix found during the search.
        closest_path: Vec<LinearizationStep>,
    },
}

impl VerificationOutcome {
    /// `true` for [`Self::Valid`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Checks an [`ExecutionResult`] for linearizability against a sequential
/// specification (spec.md §4.3).
///
/// Generic over the sequential-specification type `T`, which must be
/// [`Clone`] (the DFS explores many branches from the same state) and
/// [`PartialEq`] (state equivalence — see `cache` module docs for why this
/// is the idiomatic replacement for reflective `equals`/`hashCode`).
pub struct LinearizabilityVerifier<T> {
    factory: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T: Clone + PartialEq> LinearizabilityVerifier<T> {
    /// Builds a verifier that constructs a fresh sequential-specification
    /// instance via `factory` at the start of every [`Self::verify`] call
    /// (spec.md §3 "A sequential state is the observable state of a
    /// freshly constructed sequential-specification instance...").
    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self { factory: Box::new(factory) }
    }

    /// Verifies that `execution` (observed while running `scenario`) is
    /// explainable by some sequential interleaving on `oracle`.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::OracleDispatchFailed`] if replaying the
    /// deterministic init part diverges from what was actually observed —
    /// spec.md §4.3 "Failure semantics": this is always an "incorrect
    /// sequential specification" error, never a linearizability failure,
    /// because `init` has no concurrency to explain away.
    pub fn verify(
        &self,
        oracle: &SequentialOracle<T>,
        scenario: &Scenario,
        execution: &ExecutionResult,
    ) -> Result<VerificationOutcome, InfraError> {
        let mut instance = (self.factory)();

        for (actor, observed) in scenario.init.iter().zip(&execution.init_results) {
            let produced = oracle.apply(&mut instance, actor)?;
            if produced != observed.result {
                return Err(InfraError::OracleDispatchFailed {
                    operation: actor.operation.0.clone(),
                    message: "init-part replay diverged from the observed result".into(),
                });
            }
        }

        let thread_count = scenario.thread_count();
        let mut cache: TransitionCache<T> = TransitionCache::new();
        let mut path = Vec::new();
        let mut best_path = Vec::new();

        let found = self.dfs(
            oracle,
            scenario,
            execution,
            instance,
            vec![0; thread_count],
            Vec::new(),
            &mut cache,
            &mut path,
            &mut best_path,
        )?;

        Ok(if found {
            VerificationOutcome::Valid
        } else {
            VerificationOutcome::Invalid { closest_path: best_path }
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn dfs(
        &self,
        oracle: &SequentialOracle<T>,
        scenario: &Scenario,
        execution: &ExecutionResult,
        instance: T,
        frontier: Vec<usize>,
        pending: Vec<usize>,
        cache: &mut TransitionCache<T>,
        path: &mut Vec<LinearizationStep>,
        best_path: &mut Vec<LinearizationStep>,
    ) -> Result<bool, InfraError> {
        if path.len() > best_path.len() {
            *best_path = path.clone();
        }

        let all_threads_done =
            (0..frontier.len()).all(|t| frontier[t] == scenario.parallel[t].len());
        if all_threads_done && pending.is_empty() {
            return self.finish(oracle, scenario, execution, instance);
        }

        if cache.is_known_dead(&instance, &frontier, &pending) {
            return Ok(false);
        }

        for t in 0..frontier.len() {
            if frontier[t] >= scenario.parallel[t].len() {
                continue;
            }
            let candidate = &execution.parallel_results[t][frontier[t]];
            if let Some(clock) = &candidate.clock {
                // The recorded clock is the happens-before-start witness
                // (spec.md §3): thread `t`'s actor at this position observed
                // every other thread `j` at position `clock.position(j)`
                // before it began, so that much of `j` must already be
                // linearized before this actor can be chosen (spec.md §4.3
                // "Model" — respect program order *and* the vector-clock
                // happens-before relation).
                let blocked = (0..frontier.len())
                    .any(|j| j != t && (frontier[j] as u32) < clock.position(j));
                if blocked {
                    continue;
                }
            }
            let actor = &scenario.parallel[t][frontier[t]];
            let observed = &candidate.result;
            let mut trial = instance.clone();
            let produced = oracle.apply(&mut trial, actor)?;
            let mut new_pending = pending.clone();
            if reconcile(actor, &produced, observed, &mut new_pending) {
                new_pending.sort_unstable();
                let mut new_frontier = frontier.clone();
                new_frontier[t] += 1;
                path.push(LinearizationStep {
                    actor_id: actor.id,
                    operation: actor.operation.0.clone(),
                    is_resumption: false,
                });
                if self.dfs(
                    oracle,
                    scenario,
                    execution,
                    trial,
                    new_frontier,
                    new_pending,
                    cache,
                    path,
                    best_path,
                )? {
                    return Ok(true);
                }
                path.pop();
            }
        }

        for i in 0..pending.len() {
            let actor_id = pending[i];
            let Some(actor) = find_actor(scenario, actor_id) else { continue };
            if !oracle.has_resumption(&actor.operation) {
                continue;
            }
            let Some(observed) = observed_result_for(execution, actor_id) else { continue };
            let mut trial = instance.clone();
            let produced = oracle.resume(&mut trial, actor)?;
            if &produced == observed {
                let mut new_pending = pending.clone();
                new_pending.remove(i);
                path.push(LinearizationStep {
                    actor_id,
                    operation: actor.operation.0.clone(),
                    is_resumption: true,
                });
                if self.dfs(
                    oracle,
                    scenario,
                    execution,
                    trial,
                    frontier.clone(),
                    new_pending,
                    cache,
                    path,
                    best_path,
                )? {
                    return Ok(true);
                }
                path.pop();
            }
        }

        cache.mark_dead(instance, frontier, pending);
        Ok(false)
    }

    fn finish(
        &self,
        oracle: &SequentialOracle<T>,
        scenario: &Scenario,
        execution: &ExecutionResult,
        mut instance: T,
    ) -> Result<bool, InfraError> {
        for (actor, observed) in scenario.post.iter().zip(&execution.post_results) {
            let produced = oracle.apply(&mut instance, actor)?;
            if produced != observed.result {
                return Ok(false);
            }
        }

        if let Some(actor) = &scenario.validation {
            let produced = oracle.apply(&mut instance, actor)?;
            let matches_observed = execution
                .validation_result
                .as_ref()
                .is_none_or(|observed| produced == observed.result);
            if !matches_observed {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// Reconciles a freshly produced sequential result against the observed
/// one for a single actor firing, accounting for suspension semantics
/// (spec.md §4.3 "Tie-breaks and edge cases").
///
/// Pushes `actor.id` onto `pending` when the sequential replay suspended
/// but the real observation requires a later resumption to explain.
fn reconcile(
    actor: &Actor,
    produced: &ActorResult,
    observed: &ActorResult,
    pending: &mut Vec<usize>,
) -> bool {
    if produced == observed {
        return true;
    }
    if *produced != ActorResult::Suspended {
        return false;
    }
    if !actor.is_suspendable {
        return false;
    }
    match observed {
        ActorResult::Cancelled if actor.cancel_on_suspension => true,
        _ => {
            // The real run's final result for this actor is not a direct
            // suspension: it must be resumed later (spec.md "a suspended
            // actor may be followed at any later point by its
            // resumption").
            pending.push(actor.id);
            true
        }
    }
}

fn find_actor(scenario: &Scenario, actor_id: usize) -> Option<&Actor> {
    scenario.all_actors().find(|a| a.id == actor_id)
}

fn observed_result_for(execution: &ExecutionResult, actor_id: usize) -> Option<&ActorResult> {
    execution.all_results().find(|r| r.actor_id == actor_id).map(|r| &r.result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::actor::{Actor, ActorTemplate};
    use crate::model::execution::{Clock, ResultWithClock};
    use crate::model::result::ResultValue;
    use crate::oracle::OperationOutcome;

    #[derive(Clone, PartialEq, Debug, Default)]
    struct Counter {
        value: i64,
    }

    fn counter_oracle() -> SequentialOracle<Counter> {
        SequentialOracle::new()
            .with_operation("incAndGet", |c, _| {
                c.value += 1;
                OperationOutcome::Value(ResultValue::Int(c.value))
            })
            .with_operation("get", |c, _| OperationOutcome::Value(ResultValue::Int(c.value)))
    }

    fn inc_get_scenario() -> (Scenario, Vec<Actor>) {
        let inc = ActorTemplate::new("incAndGet");
        let get = ActorTemplate::new("get");
        let t0 = Actor::from_template(0, &inc, vec![]);
        let t1 = Actor::from_template(1, &get, vec![]);
        let t2 = Actor::from_template(2, &inc, vec![]);
        let t3 = Actor::from_template(3, &get, vec![]);
        let actors = vec![t0.clone(), t1.clone(), t2.clone(), t3.clone()];
        let scenario =
            Scenario::new(vec![], vec![vec![t0, t1], vec![t2, t3]], vec![], None).unwrap();
        (scenario, actors)
    }

    #[test]
    fn accepts_a_genuinely_linearizable_execution() {
        let (scenario, _) = inc_get_scenario();
        let oracle = counter_oracle();
        let verifier = LinearizabilityVerifier::new(Counter::default);

        // Linearization incAndGet(t0)->1, get(t1)->1, incAndGet(t2)->2, get(t3)->2.
        let execution = ExecutionResult {
            init_results: vec![],
            parallel_results: vec![
                vec![
                    ResultWithClock {
                        actor_id: 0,
                        result: ActorResult::Value(ResultValue::Int(1)),
                        clock: Some(Clock::from_positions([0, 0])),
                    },
                    ResultWithClock {
                        actor_id: 1,
                        result: ActorResult::Value(ResultValue::Int(1)),
                        clock: Some(Clock::from_positions([1, 0])),
                    },
                ],
                vec![
                    ResultWithClock {
                        actor_id: 2,
                        result: ActorResult::Value(ResultValue::Int(2)),
                        clock: Some(Clock::from_positions([0, 0])),
                    },
                    ResultWithClock {
                        actor_id: 3,
                        result: ActorResult::Value(ResultValue::Int(2)),
                        clock: Some(Clock::from_positions([0, 1])),
                    },
                ],
            ],
            post_results: vec![],
            validation_result: None,
        };

        let outcome = verifier.verify(&oracle, &scenario, &execution).unwrap();
        assert!(outcome.is_valid());
    }

    #[test]
    fn rejects_an_impossible_execution() {
        let (scenario, _) = inc_get_scenario();
        let oracle = counter_oracle();
        let verifier = LinearizabilityVerifier::new(Counter::default);

        // Both threads observe get() == 1 after their own incAndGet — but a
        // counter starting at 0 can never have two independent increments
        // both see a final value of 1 for both get() calls in sequence.
        let execution = ExecutionResult {
            init_results: vec![],
            parallel_results: vec![
                vec![
                    ResultWithClock {
                        actor_id: 0,
                        result: ActorResult::Value(ResultValue::Int(1)),
                        clock: Some(Clock::from_positions([0, 0])),
                    },
                    ResultWithClock {
                        actor_id: 1,
                        result: ActorResult::Value(ResultValue::Int(1)),
                        clock: Some(Clock::from_positions([1, 0])),
                    },
                ],
                vec![
                    ResultWithClock {
                        actor_id: 2,
                        result: ActorResult::Value(ResultValue::Int(1)),
                        clock: Some(Clock::from_positions([0, 0])),
                    },
                    ResultWithClock {
                        actor_id: 3,
                        result: ActorResult::Value(ResultValue::Int(1)),
                        clock: Some(Clock::from_positions([0, 1])),
                    },
                ],
            ],
            post_results: vec![],
            validation_result: None,
        };

        let outcome = verifier.verify(&oracle, &scenario, &execution).unwrap();
        assert!(!outcome.is_valid());
    }

    #[test]
    fn clock_forbids_a_real_time_violating_order_even_when_frontier_alone_would_accept_it() {
        let inc = ActorTemplate::new("incAndGet");
        let a0 = Actor::from_template(0, &inc, vec![]);
        let a1 = Actor::from_template(1, &inc, vec![]);
        let scenario = Scenario::new(vec![], vec![vec![a0], vec![a1]], vec![], None).unwrap();
        let oracle = counter_oracle();
        let verifier = LinearizabilityVerifier::new(Counter::default);

        // Results only match the order a0 -> a1 (1 then 2). But a0's clock
        // says thread 1's actor had already reached position 1 (i.e. a1 had
        // already run) before a0 started, so the only result-matching order
        // is forbidden by the observed happens-before relation.
        let execution = ExecutionResult {
            init_results: vec![],
            parallel_results: vec![
                vec![ResultWithClock {
                    actor_id: 0,
                    result: ActorResult::Value(ResultValue::Int(1)),
                    clock: Some(Clock::from_positions([0, 1])),
                }],
                vec![ResultWithClock {
                    actor_id: 1,
                    result: ActorResult::Value(ResultValue::Int(2)),
                    clock: Some(Clock::from_positions([0, 0])),
                }],
            ],
            post_results: vec![],
            validation_result: None,
        };

        let outcome = verifier.verify(&oracle, &scenario, &execution).unwrap();
        assert!(!outcome.is_valid());
    }

    #[test]
    fn suspended_actor_resolved_by_later_resumption() {
        let awaited = ActorTemplate::new("await").suspendable(false);
        let signal = ActorTemplate::new("signal");
        let a0 = Actor::from_template(0, &awaited, vec![]);
        let a1 = Actor::from_template(1, &signal, vec![]);
        let scenario = Scenario::new(vec![], vec![vec![a0], vec![a1]], vec![], None).unwrap();

        #[derive(Clone, PartialEq, Default)]
        struct Rendezvous {
            signaled: bool,
        }

        let oracle: SequentialOracle<Rendezvous> = SequentialOracle::new()
            .with_operation("await", |r, _| {
                if r.signaled {
                    OperationOutcome::Value(ResultValue::Unit)
                } else {
                    OperationOutcome::Suspended
                }
            })
            .with_resumption("await", |r| {
                if r.signaled {
                    OperationOutcome::Value(ResultValue::Unit)
                } else {
                    OperationOutcome::Suspended
                }
            })
            .with_operation("signal", |r, _| {
                r.signaled = true;
                OperationOutcome::Void
            });

        let execution = ExecutionResult {
            init_results: vec![],
            parallel_results: vec![
                vec![ResultWithClock {
                    actor_id: 0,
                    result: ActorResult::Value(ResultValue::Unit),
                    clock: Some(Clock::from_positions([0, 0])),
                }],
                vec![ResultWithClock {
                    actor_id: 1,
                    result: ActorResult::Void,
                    clock: Some(Clock::from_positions([0, 0])),
                }],
            ],
            post_results: vec![],
            validation_result: None,
        };

        let verifier = LinearizabilityVerifier::new(Rendezvous::default);
        let outcome = verifier.verify(&oracle, &scenario, &execution).unwrap();
        assert!(outcome.is_valid());
    }
}
