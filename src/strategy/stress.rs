//! The stress strategy (spec.md §4.4): real thread scheduling plus timing
//! jitter, run on a dedicated worker pool.

use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::model::actor::Actor;
use crate::model::execution::{Clock, ExecutionResult, ResultWithClock};
use crate::model::scenario::Scenario;
use crate::oracle::SequentialOracle;
use crate::strategy::{InvocationOutcome, ThreadDump};
use crate::util::det_rng::DetRng;

/// Maximum per-actor spin delay, in microseconds, used to diversify
/// interleavings (spec.md §4.4 "brief, randomized spin delays").
const MAX_JITTER_MICROS: u64 = 200;

/// Runs scenarios on a dedicated thread pool using a two-phase barrier
/// (spec.md §4.4).
pub struct StressStrategy {
    /// Per-invocation timeout; exceeding it yields [`InvocationOutcome::Deadlock`].
    pub timeout: Duration,
}

impl StressStrategy {
    /// Runs one invocation of `scenario` against `instance`, deterministic
    /// in `(run_seed, invocation_index)` for its timing jitter (spec.md §8
    /// property 3).
    ///
    /// `instance` must be `Sync` because every worker thread dispatches
    /// actors against the same shared state guarded by a mutex — this
    /// crate does not assume the class under test is internally
    /// synchronized (that is exactly the property under test).
    pub fn run_invocation<T: Send>(
        &self,
        scenario: &Scenario,
        oracle: &SequentialOracle<T>,
        instance: T,
        run_seed: u64,
        invocation_index: u64,
    ) -> (InvocationOutcome, T)
    where
        T: 'static,
        SequentialOracle<T>: Sync,
    {
        let thread_count = scenario.thread_count();
        let shared = Arc::new(Mutex::new(instance));
        let start_barrier = Arc::new(Barrier::new(thread_count));
        let completion_barrier = Arc::new(Barrier::new(thread_count));
        let invocation_rng = DetRng::new(run_seed).fork(invocation_index);

        let init_results = apply_sequential(oracle, &shared, &scenario.init);

        let deadline = Instant::now() + self.timeout;
        let result_slots: Arc<Mutex<Vec<Vec<Option<ResultWithClock>>>>> = Arc::new(Mutex::new(
            scenario.parallel.iter().map(|t| vec![None; t.len()]).collect(),
        ));
        let progress: Arc<[std::sync::atomic::AtomicUsize]> =
            (0..thread_count).map(|_| std::sync::atomic::AtomicUsize::new(0)).collect();

        thread::scope(|scope| {
            for (thread_idx, thread_actors) in scenario.parallel.iter().enumerate() {
                let shared = Arc::clone(&shared);
                let start_barrier = Arc::clone(&start_barrier);
                let completion_barrier = Arc::clone(&completion_barrier);
                let result_slots = Arc::clone(&result_slots);
                let progress = Arc::clone(&progress);
                let mut jitter_rng = invocation_rng.fork(thread_idx as u64);

                scope.spawn(move || {
                    start_barrier.wait();
                    for (pos, actor) in thread_actors.iter().enumerate() {
                        let clock = clock_snapshot(&progress, thread_idx, pos);
                        let outcome = {
                            let mut guard = shared.lock().expect("instance mutex poisoned");
                            oracle.apply(&mut guard, actor)
                        };
                        let result = match outcome {
                            Ok(result) => result,
                            Err(err) => {
                                // Record a NoResult and stop this thread; the
                                // error surfaces once all threads rejoin.
                                let mut slots = result_slots.lock().expect("slots mutex poisoned");
                                slots[thread_idx][pos] = Some(ResultWithClock {
                                    actor_id: actor.id,
                                    result: crate::model::result::ActorResult::NoResult,
                                    clock: Some(clock),
                                });
                                drop(slots);
                                let _ = err;
                                break;
                            }
                        };
                        {
                            let mut slots = result_slots.lock().expect("slots mutex poisoned");
                            slots[thread_idx][pos] =
                                Some(ResultWithClock { actor_id: actor.id, result, clock: Some(clock) });
                        }
                        progress[thread_idx].store(pos + 1, std::sync::atomic::Ordering::SeqCst);

                        let jitter = jitter_rng.next_u64() % (MAX_JITTER_MICROS + 1);
                        spin_for(Duration::from_micros(jitter), deadline);
                    }
                    completion_barrier.wait();
                });
            }
        });

        let elapsed_past_deadline = Instant::now() > deadline;
        let slots = Arc::try_unwrap(result_slots)
            .unwrap_or_else(|arc| Mutex::new(arc.lock().expect("poisoned").clone()))
            .into_inner()
            .expect("slots mutex poisoned");

        if elapsed_past_deadline || slots.iter().flatten().any(Option::is_none) {
            let dump = ThreadDump {
                threads: (0..thread_count).map(|t| format!("worker-{t}: incomplete")).collect(),
            };
            let instance = Arc::try_unwrap(shared)
                .unwrap_or_else(|_| panic!("instance still shared after scope join"))
                .into_inner()
                .expect("instance mutex poisoned");
            return (InvocationOutcome::Deadlock(dump), instance);
        }

        let mut parallel_results: Vec<Vec<ResultWithClock>> = slots
            .into_iter()
            .map(|thread_slots| thread_slots.into_iter().map(Option::unwrap).collect())
            .collect();

        let mut instance = Arc::try_unwrap(shared)
            .unwrap_or_else(|_| panic!("instance still shared after scope join"))
            .into_inner()
            .expect("instance mutex poisoned");

        // See spec.md §9 "Suspension / continuations": a suspended actor may
        // be resumed once the rest of the parallel part has run.
        for (thread_idx, thread_actors) in scenario.parallel.iter().enumerate() {
            for (pos, actor) in thread_actors.iter().enumerate() {
                if parallel_results[thread_idx][pos].result
                    != crate::model::result::ActorResult::Suspended
                    || !oracle.has_resumption(&actor.operation)
                {
                    continue;
                }
                if let Ok(resumed) = oracle.resume(&mut instance, actor) {
                    if resumed != crate::model::result::ActorResult::Suspended {
                        parallel_results[thread_idx][pos].result = resumed;
                    }
                }
            }
        }

        let post_results = apply_sequential_owned(oracle, &mut instance, &scenario.post);
        let validation_result = scenario.validation.as_ref().and_then(|actor| {
            oracle.apply(&mut instance, actor).ok().map(|result| ResultWithClock {
                actor_id: actor.id,
                result,
                clock: None,
            })
        });

        let exec = ExecutionResult { init_results, parallel_results, post_results, validation_result };
        (InvocationOutcome::Completed(exec), instance)
    }
}

fn clock_snapshot(progress: &[std::sync::atomic::AtomicUsize], own_thread: usize, own_pos: usize) -> Clock {
    Clock::from_positions(progress.iter().enumerate().map(|(t, counter)| {
        if t == own_thread {
            own_pos as u32
        } else {
            counter.load(std::sync::atomic::Ordering::SeqCst) as u32
        }
    }))
}

fn apply_sequential<T>(
    oracle: &SequentialOracle<T>,
    instance: &Arc<Mutex<T>>,
    actors: &[Actor],
) -> Vec<ResultWithClock> {
    let mut guard = instance.lock().expect("instance mutex poisoned");
    apply_sequential_owned(oracle, &mut guard, actors)
}

fn apply_sequential_owned<T>(
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

/// Busy-spins for roughly `d`, bailing out early if `deadline` has passed
/// (so a pathological jitter schedule cannot itself blow the invocation
/// timeout).
fn spin_for(d: Duration, deadline: Instant) {
    if d.is_zero() {
        return;
    }
    let until = Instant::now() + d;
    while Instant::now() < until {
        if Instant::now() > deadline {
            break;
        }
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::actor::ActorTemplate;
    use crate::oracle::OperationOutcome;
    use crate::model::result::ResultValue;

    #[derive(Debug)]
    struct Counter {
        value: i64,
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
            OperationOutcome::Value(ResultValue::Int(c.value))
        })
    }

    #[test]
    fn both_increments_observed_exactly_once() {
        let strategy = StressStrategy { timeout: Duration::from_secs(5) };
        let scenario = scenario_two_threads();
        let oracle = counter_oracle();
        let (outcome, instance) =
            strategy.run_invocation(&scenario, &oracle, Counter { value: 0 }, 1, 0);
        assert_eq!(instance.value, 2);
        match outcome {
            InvocationOutcome::Completed(exec) => {
                assert_eq!(exec.parallel_results.len(), 2);
                assert_eq!(exec.parallel_results[0].len(), 1);
                assert_eq!(exec.parallel_results[1].len(), 1);
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn same_invocation_index_reproduces_same_jitter_schedule() {
        let strategy = StressStrategy { timeout: Duration::from_secs(5) };
        let scenario = scenario_two_threads();
        let oracle = counter_oracle();
        let (_, a) = strategy.run_invocation(&scenario, &oracle, Counter { value: 0 }, 7, 2);
        let (_, b) = strategy.run_invocation(&scenario, &oracle, Counter { value: 0 }, 7, 2);
        assert_eq!(a.value, b.value);
    }
}
