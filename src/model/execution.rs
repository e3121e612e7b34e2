//! Execution results with per-thread vector clocks (spec.md §3 "ExecutionResult").

use crate::model::result::ActorResult;
use smallvec::SmallVec;

/// Inline capacity for a clock vector before it spills to the heap; covers
/// the overwhelming majority of scenarios (spec.md default `threads = 2`,
/// most hand-written scenarios stay under a handful of threads).
const INLINE_THREADS: usize = 4;

/// A fixed-length vector of non-negative integers, one entry per parallel
/// thread, recording the happens-before-start witness for a single actor
/// (spec.md §3 "ExecutionResult").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clock(SmallVec<[u32; INLINE_THREADS]>);

impl Clock {
    /// A zero clock over `thread_count` threads.
    #[must_use]
    pub fn zero(thread_count: usize) -> Self {
        Self(SmallVec::from_elem(0, thread_count))
    }

    /// Builds a clock directly from per-thread positions.
    #[must_use]
    pub fn from_positions(positions: impl IntoIterator<Item = u32>) -> Self {
        Self(positions.into_iter().collect())
    }

    /// The recorded position for `thread`.
    #[must_use]
    pub fn position(&self, thread: usize) -> u32 {
        self.0.get(thread).copied().unwrap_or(0)
    }

    /// Number of thread entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this clock carries no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` if every entry of `self` is `<=` the corresponding entry of
    /// `other` (the happens-before-or-equal partial order).
    #[must_use]
    pub fn happens_before_or_eq(&self, other: &Self) -> bool {
        (0..self.len().max(other.len())).all(|i| self.position(i) <= other.position(i))
    }
}

/// A single actor's outcome together with the clock recorded just before
/// it ran (spec.md §3).
#[derive(Debug, Clone)]
pub struct ResultWithClock {
    /// The actor's id within the owning scenario.
    pub actor_id: usize,
    /// The observed result.
    pub result: ActorResult,
    /// The happens-before-start witness, `None` for init/post actors
    /// (spec.md §3 "initial/post sequences have no clocks").
    pub clock: Option<Clock>,
}

/// The full outcome of one invocation of a scenario (spec.md §3
/// "ExecutionResult").
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// Results of the init part, in order, no clocks.
    pub init_results: Vec<ResultWithClock>,
    /// Per-thread result sequences from the parallel part, each entry
    /// carrying a clock.
    pub parallel_results: Vec<Vec<ResultWithClock>>,
    /// Results of the post part, in order, no clocks.
    pub post_results: Vec<ResultWithClock>,
    /// Result of the validation actor, if the scenario declared one.
    pub validation_result: Option<ResultWithClock>,
}

impl ExecutionResult {
    /// Checks the clock monotonicity invariant from spec.md §3: within
    /// each parallel thread, clock entries are non-decreasing, and the
    /// entry for a thread's own index equals its position in that thread
    /// minus one (the "before this actor ran" position).
    #[must_use]
    pub fn clocks_are_well_formed(&self) -> bool {
        for (thread_idx, thread) in self.parallel_results.iter().enumerate() {
            let mut prev: Option<&Clock> = None;
            for (position, entry) in thread.iter().enumerate() {
                let Some(clock) = &entry.clock else { return false };
                if clock.position(thread_idx) != position as u32 {
                    return false;
                }
                if let Some(prev_clock) = prev {
                    if !prev_clock.happens_before_or_eq(clock) {
                        return false;
                    }
                }
                prev = Some(clock);
            }
        }
        self.init_results.iter().all(|r| r.clock.is_none())
            && self.post_results.iter().all(|r| r.clock.is_none())
    }

    /// Iterates every result in the execution, init first, then each
    /// parallel thread, then post, then validation.
    pub fn all_results(&self) -> impl Iterator<Item = &ResultWithClock> {
        self.init_results
            .iter()
            .chain(self.parallel_results.iter().flatten())
            .chain(self.post_results.iter())
            .chain(self.validation_result.iter())
    }
}
