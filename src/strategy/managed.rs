//! The managed (model-checking) strategy (spec.md §4.5).
//!
//! Replaces real scheduling with deterministic single-stepping. A full
//! bytecode-level interceptor that can suspend a JVM thread mid-instruction
//! is out of scope for this crate (spec.md §1 — the bytecode-instrumentation
//! layer is an external collaborator, described only at its interface). This
//! implementation instead interleaves at actor granularity on a single OS
//! thread: exactly one user actor dispatches at a time (spec.md §5 "at most
//! one user thread is runnable at a time"), the [`EventTracker`] calls made
//! from inside that dispatch are fully recorded for the trace, and the
//! *order* in which threads' actors are chosen is what the
//! [`SearchDriver`] varies from invocation to invocation. This is the
//! documented resolution of spec.md §9's open question on search-driver
//! heuristics — see `DESIGN.md`.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

use crate::model::actor::Actor;
use crate::model::execution::{Clock, ExecutionResult, ResultWithClock};
use crate::model::scenario::Scenario;
use crate::oracle::SequentialOracle;
use crate::strategy::event::{EventTracker, SwitchPointKind, TraceEvent};
use crate::strategy::{InvocationOutcome, Snapshot};
use crate::util::codeloc::CodeLocationId;
use crate::util::det_rng::DetRng;

/// Picks the order in which runnable threads are stepped, one decision per
/// scenario-level actor dispatch (spec.md §4.5 "search driver").
///
/// The chosen policy is "random without replacement within each round,
/// reseeded per invocation index" — every invocation re-shuffles the
/// runnable-thread order from a child stream of the invocation seed, so
/// replaying invocation *i* always explores the same trajectory (spec.md
/// §8 property 2) while successive invocations explore distinct ones.
#[derive(Debug)]
pub struct SearchDriver {
    rng: DetRng,
}

impl SearchDriver {
    /// Builds a driver for one invocation, deriving its stream from
    /// `(run_seed, invocation_index)`.
    #[must_use]
    pub fn for_invocation(run_seed: u64, invocation_index: u64) -> Self {
        Self { rng: DetRng::new(run_seed).fork(invocation_index) }
    }

    /// Picks the index (into `runnable`) of the thread to step next.
    fn pick(&mut self, runnable: &[usize]) -> usize {
        self.rng.next_usize(runnable.len())
    }
}

/// Per-invocation scheduler state, shared with the [`ManagedEventTracker`]
/// handed to actor bodies.
struct SchedulerState {
    trace: Vec<TraceEvent>,
    ignored_depth: Vec<u32>,
    current_thread: usize,
    rngs: Vec<DetRng>,
}

/// The [`EventTracker`] implementation actor bodies see while running under
/// the managed strategy.
pub struct ManagedEventTracker<'a> {
    state: &'a Mutex<SchedulerState>,
}

impl<'a> ManagedEventTracker<'a> {
    fn record(&self, kind: SwitchPointKind, loc: CodeLocationId, detail: Option<String>) {
        let mut state = self.state.lock().expect("scheduler state poisoned");
        let thread = state.current_thread;
        if state.ignored_depth[thread] == 0 {
            state.trace.push(TraceEvent { thread, kind, location: loc, detail });
        }
    }
}

impl EventTracker for ManagedEventTracker<'_> {
    fn lock(&self, loc: CodeLocationId) {
        self.record(SwitchPointKind::Lock, loc, None);
    }

    fn unlock(&self, loc: CodeLocationId) {
        self.record(SwitchPointKind::Unlock, loc, None);
    }

    fn park(&self, loc: CodeLocationId) {
        self.record(SwitchPointKind::Park, loc, None);
    }

    fn unpark(&self, thread: usize, loc: CodeLocationId) {
        self.record(SwitchPointKind::Unpark, loc, Some(format!("target={thread}")));
    }

    fn wait(&self, loc: CodeLocationId, with_timeout: bool) {
        self.record(SwitchPointKind::Wait { with_timeout }, loc, None);
    }

    fn notify(&self, loc: CodeLocationId, all: bool) {
        self.record(SwitchPointKind::Notify { all }, loc, None);
    }

    fn before_read(&self, loc: CodeLocationId) {
        self.record(SwitchPointKind::BeforeRead, loc, None);
    }

    fn before_write(&self, loc: CodeLocationId) {
        self.record(SwitchPointKind::BeforeWrite, loc, None);
    }

    fn before_method_call(&self, owner: &str, method: &str, loc: CodeLocationId) {
        self.record(
            SwitchPointKind::BeforeMethodCall,
            loc,
            Some(format!("{owner}::{method}")),
        );
    }

    fn before_atomic_method_call(&self, loc: CodeLocationId) {
        self.record(SwitchPointKind::BeforeAtomicMethodCall, loc, None);
    }

    fn random_next_int(&self, loc: CodeLocationId) -> i32 {
        self.record(SwitchPointKind::RandomNextInt, loc, None);
        let mut state = self.state.lock().expect("scheduler state poisoned");
        let thread = state.current_thread;
        state.rngs[thread].next_u32() as i32
    }

    fn enter_ignored_section(&self) {
        let mut state = self.state.lock().expect("scheduler state poisoned");
        let thread = state.current_thread;
        state.ignored_depth[thread] += 1;
    }

    fn leave_ignored_section(&self) {
        let mut state = self.state.lock().expect("scheduler state poisoned");
        let thread = state.current_thread;
        state.ignored_depth[thread] = state.ignored_depth[thread].saturating_sub(1);
    }
}

/// The managed strategy itself: deterministic interleaving exploration over
/// a single scenario (spec.md §4.5).
pub struct ManagedStrategy {
    /// Whether to additionally check obstruction freedom (spec.md §4.5,
    /// §6 `checkObstructionFreedom`).
    pub check_obstruction_freedom: bool,
    /// Consecutive non-progressing switch points before a livelock is
    /// flagged (spec.md §6 `hangingDetectionThreshold`).
    pub hanging_detection_threshold: u32,
}

impl ManagedStrategy {
    /// Runs one invocation of `scenario` against `instance` under `oracle`,
    /// deterministic in `(run_seed, invocation_index)`.
    pub fn run_invocation<T: Snapshot>(
        &self,
        scenario: &Scenario,
        oracle: &SequentialOracle<T>,
        instance: &mut T,
        run_seed: u64,
        invocation_index: u64,
    ) -> (InvocationOutcome, Vec<TraceEvent>) {
        if self.check_obstruction_freedom {
            if let Some(actor) = scenario
                .parallel
                .iter()
                .flatten()
                .find(|a| a.blocking || a.causes_blocking)
            {
                return (
                    InvocationOutcome::SpecViolation(format!(
                        "obstruction-freedom violation: actor `{}` blocks its thread",
                        actor.operation
                    )),
                    Vec::new(),
                );
            }
        }

        let thread_count = scenario.thread_count();
        let shared = Mutex::new(SchedulerState {
            trace: Vec::new(),
            ignored_depth: vec![0; thread_count],
            current_thread: 0,
            rngs: (0..thread_count)
                .map(|t| DetRng::new(run_seed).fork(invocation_index).fork(t as u64))
                .collect(),
        });

        let init_results = apply_sequential(oracle, instance, &scenario.init);

        let mut driver = SearchDriver::for_invocation(run_seed, invocation_index);
        let mut frontier = vec![0usize; thread_count];
        let mut parallel_results: Vec<Vec<ResultWithClock>> =
            (0..thread_count).map(|_| Vec::new()).collect();
        let mut suspended: Vec<(usize, usize)> = Vec::new();

        let mut consecutive_same_thread: u32 = 0;
        let mut last_thread: Option<usize> = None;

        loop {
            let runnable: Vec<usize> = (0..thread_count)
                .filter(|&t| frontier[t] < scenario.parallel[t].len())
                .collect();
            if runnable.is_empty() {
                break;
            }

            let pick_idx = driver.pick(&runnable);
            let thread = runnable[pick_idx];

            if last_thread == Some(thread) {
                consecutive_same_thread += 1;
            } else {
                consecutive_same_thread = 0;
            }
            last_thread = Some(thread);
            if self.check_obstruction_freedom
                && runnable.len() > 1
                && consecutive_same_thread > self.hanging_detection_threshold
            {
                let trace = shared.into_inner().expect("scheduler state poisoned").trace;
                return (
                    InvocationOutcome::SpecViolation(
                        "obstruction-freedom violation: one thread monopolized the schedule"
                            .to_string(),
                    ),
                    trace,
                );
            }

            let clock = Clock::from_positions(frontier.iter().map(|&p| p as u32));
            let actor: &Actor = &scenario.parallel[thread][frontier[thread]];

            {
                let mut state = shared.lock().expect("scheduler state poisoned");
                state.current_thread = thread;
            }

            let result = match oracle.apply(instance, actor) {
                Ok(result) => result,
                Err(err) => {
                    let trace = shared.into_inner().expect("scheduler state poisoned").trace;
                    return (
                        InvocationOutcome::UnexpectedException(err.to_string()),
                        trace,
                    );
                }
            };

            let slot_index = parallel_results[thread].len();
            if result == crate::model::result::ActorResult::Suspended {
                suspended.push((thread, slot_index));
            }
            parallel_results[thread].push(ResultWithClock {
                actor_id: actor.id,
                result,
                clock: Some(clock),
            });
            frontier[thread] += 1;
        }

        // A suspended actor may be resumed once the rest of the parallel
        // part has run, e.g. by a `signal`-style actor mutating shared
        // state the suspended actor's resumption closure observes
        // (spec.md §9 "Suspension / continuations").
        for (thread, slot) in suspended {
            let actor = &scenario.parallel[thread][slot];
            if !oracle.has_resumption(&actor.operation) {
                continue;
            }
            if let Ok(resumed) = oracle.resume(instance, actor) {
                if resumed != crate::model::result::ActorResult::Suspended {
                    parallel_results[thread][slot].result = resumed;
                }
            }
        }

        let post_results = apply_sequential(oracle, instance, &scenario.post);
        let validation_result = scenario.validation.as_ref().and_then(|actor| {
            oracle.apply(instance, actor).ok().map(|result| ResultWithClock {
                actor_id: actor.id,
                result,
                clock: None,
            })
        });

        let trace = shared.into_inner().expect("scheduler state poisoned").trace;
        let exec = ExecutionResult { init_results, parallel_results, post_results, validation_result };
        (InvocationOutcome::Completed(exec), trace)
    }
}

fn apply_sequential<T>(
    oracle: &SequentialOracle<T>,
    instance: &mut T,
    actors: &[Actor],
) -> Vec<ResultWithClock> {
    actors
        .iter()
        .filter_map(|actor| {
            oracle
                .apply(instance, actor)
                .ok()
                .map(|result| ResultWithClock { actor_id: actor.id, result, clock: None })
        })
        .collect()
}

/// Monotonic process-wide counter, used when a caller needs a cheap
/// thread-local-ish tag without pulling in `std::thread::ThreadId`'s
/// opaque type (spec.md §4.5 local-object tracking uses this to tag
/// newly-created objects, in the reduced form this crate implements).
static NEXT_OBJECT_TAG: AtomicI32 = AtomicI32::new(0);

/// Allocates a fresh tag for a newly-created object under the managed
/// strategy's local-object tracking scheme.
pub fn next_object_tag() -> i32 {
    NEXT_OBJECT_TAG.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::actor::ActorTemplate;
    use crate::oracle::OperationOutcome;

    #[derive(Clone)]
    struct Counter {
        value: i64,
    }

    impl Snapshot for Counter {
        type State = i64;
        fn snapshot(&self) -> i64 {
            self.value
        }
        fn restore(&mut self, state: i64) {
            self.value = state;
        }
    }

    fn scenario_two_threads() -> Scenario {
        let inc = ActorTemplate::new("incAndGet");
        let t0 = Actor::from_template(0, &inc, vec![]);
        let t1 = Actor::from_template(1, &inc, vec![]);
        Scenario::new(vec![], vec![vec![t0], vec![t1]], vec![], None).unwrap()
    }

    fn counter_oracle() -> SequentialOracle<Counter> {
        SequentialOracle::new().with_operation("incAndGet", |c, _| {
            c.value += 1;
            OperationOutcome::Value(crate::model::result::ResultValue::Int(c.value))
        })
    }

    #[test]
    fn same_invocation_index_reproduces_same_schedule() {
        let strategy =
            ManagedStrategy { check_obstruction_freedom: false, hanging_detection_threshold: 1000 };
        let scenario = scenario_two_threads();
        let oracle = counter_oracle();

        let mut a = Counter { value: 0 };
        let (outcome_a, trace_a) = strategy.run_invocation(&scenario, &oracle, &mut a, 42, 3);
        let mut b = Counter { value: 0 };
        let (outcome_b, trace_b) = strategy.run_invocation(&scenario, &oracle, &mut b, 42, 3);

        assert_eq!(trace_a.len(), trace_b.len());
        match (outcome_a, outcome_b) {
            (InvocationOutcome::Completed(ea), InvocationOutcome::Completed(eb)) => {
                for (ta, tb) in ea.parallel_results.iter().zip(&eb.parallel_results) {
                    assert_eq!(ta.len(), tb.len());
                }
            }
            other => panic!("expected both completed, got {other:?}"),
        }
    }

    #[test]
    fn declared_blocking_actor_flags_obstruction_freedom_violation() {
        let strategy =
            ManagedStrategy { check_obstruction_freedom: true, hanging_detection_threshold: 1000 };
        let blocking = ActorTemplate::new("lock");
        let mut blocking = blocking;
        blocking.blocking = true;
        let actor = Actor::from_template(0, &blocking, vec![]);
        let scenario = Scenario::new(vec![], vec![vec![actor]], vec![], None).unwrap();
        let oracle: SequentialOracle<Counter> =
            SequentialOracle::new().with_operation("lock", |_c, _| OperationOutcome::Void);
        let mut instance = Counter { value: 0 };
        let (outcome, _) = strategy.run_invocation(&scenario, &oracle, &mut instance, 1, 0);
        assert!(matches!(outcome, InvocationOutcome::SpecViolation(_)));
    }
}
