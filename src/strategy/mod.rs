//! Invocation strategies: stress (real threads) and managed (deterministic
//! single-stepping), sharing one contract over a single invocation
//! (spec.md §1, §4.4, §4.5, §7).

pub mod event;
pub mod managed;
pub mod stress;

pub use event::EventTracker;

use crate::model::execution::ExecutionResult;

/// A thread dump restricted to the runner's own threads (spec.md §4.4
/// "carrying a thread dump restricted to the runner's threads").
#[derive(Debug, Clone, Default)]
pub struct ThreadDump {
    /// One entry per worker thread, best-effort human-readable state.
    pub threads: Vec<String>,
}

/// What a single invocation produced (spec.md §7 "Invocation outcomes").
///
/// Recoverable within the iteration: the run controller converts these
/// into [`crate::failure::Failure`]s or drives another invocation. This is
/// ordinary data, not an [`crate::error::Error`] — see SPEC_FULL.md §10.2.
#[derive(Debug, Clone)]
pub enum InvocationOutcome {
    /// The invocation ran to completion; `execution` is ready for the
    /// verifier.
    Completed(ExecutionResult),
    /// The invocation timed out or deadlocked.
    Deadlock(ThreadDump),
    /// A user actor threw an exception not declared in its
    /// `handled_exceptions`.
    UnexpectedException(String),
    /// The test class's own validation actor rejected the resulting state.
    SpecViolation(String),
}

/// A trait the test-instance author implements so the managed strategy can
/// snapshot and restore state between invocations without reflection
/// (spec.md §4.5 "State snapshots"; SPEC_FULL.md §11).
pub trait Snapshot {
    /// Opaque, cheaply clonable snapshot of all state relevant to
    /// linearizability.
    type State: Clone;

    /// Captures the current state.
    fn snapshot(&self) -> Self::State;

    /// Restores a previously captured state.
    fn restore(&mut self, state: Self::State);
}
