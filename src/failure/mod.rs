//! Failure taxonomy and trace rendering (spec.md §4.7).

use crate::model::execution::ExecutionResult;
use crate::model::scenario::Scenario;
use crate::strategy::event::TraceEvent;
use crate::strategy::ThreadDump;
use crate::verifier::LinearizationStep;

/// The closed set of ways a checker run can fail (spec.md §4.7).
///
/// Every variant carries the minimized scenario that reproduces it; the
/// managed-strategy trace and thread dump are only ever present for the
/// strategy that actually produces them (spec.md §4.4/§4.5).
#[derive(Debug, Clone)]
pub enum Failure {
    /// The verifier rejected an `ExecutionResult`: no interleaving of the
    /// observed actors, replayed sequentially, reproduces it.
    IncorrectResults {
        /// The (possibly minimized) scenario that reproduces the failure.
        scenario: Scenario,
        /// The observed execution the verifier rejected.
        execution: ExecutionResult,
        /// The longest matching prefix the verifier's DFS found before
        /// every continuation dead-ended (spec.md §4.3 "the verifier
        /// returns the LTS path closest to the observed prefix").
        closest_path: Vec<LinearizationStep>,
        /// Managed-strategy trace, if the invocation ran under it.
        trace: Option<Vec<TraceEvent>>,
    },
    /// An invocation exceeded its timeout budget (spec.md §4.4/§4.6).
    DeadlockOrLivelock {
        /// The (possibly minimized) scenario that reproduces the hang.
        scenario: Scenario,
        /// Best-effort snapshot of the runner's own threads.
        thread_dump: ThreadDump,
        /// Managed-strategy trace, if the invocation ran under it.
        trace: Option<Vec<TraceEvent>>,
    },
    /// A declared-blocking actor, or a thread that monopolized the
    /// schedule, violated obstruction-freedom (spec.md §4.5).
    ObstructionFreedomViolation {
        /// The (possibly minimized) scenario that reproduces the violation.
        scenario: Scenario,
        /// Human-readable description of which condition triggered.
        reason: String,
        /// Managed-strategy trace, if the invocation ran under it.
        trace: Option<Vec<TraceEvent>>,
    },
    /// A user actor threw an exception class not declared in its
    /// `handled_exceptions` (spec.md §4.2, §7).
    UnexpectedException {
        /// The (possibly minimized) scenario that reproduces the failure.
        scenario: Scenario,
        /// Human-readable description of the exception.
        message: String,
        /// Managed-strategy trace, if the invocation ran under it.
        trace: Option<Vec<TraceEvent>>,
    },
    /// The test class's own validation actor rejected the resulting state
    /// (spec.md §3 "Scenario", §4.6).
    ValidationFailure {
        /// The (possibly minimized) scenario that reproduces the failure.
        scenario: Scenario,
        /// The observed execution, including the rejected validation result.
        execution: ExecutionResult,
        /// Managed-strategy trace, if the invocation ran under it.
        trace: Option<Vec<TraceEvent>>,
    },
}

impl Failure {
    /// The scenario every variant carries, already minimized if the run
    /// controller was configured to minimize (spec.md §4.6).
    #[must_use]
    pub fn scenario(&self) -> &Scenario {
        match self {
            Self::IncorrectResults { scenario, .. }
            | Self::DeadlockOrLivelock { scenario, .. }
            | Self::ObstructionFreedomViolation { scenario, .. }
            | Self::UnexpectedException { scenario, .. }
            | Self::ValidationFailure { scenario, .. } => scenario,
        }
    }

    /// The managed-strategy trace, if one was captured.
    #[must_use]
    pub fn trace(&self) -> Option<&[TraceEvent]> {
        match self {
            Self::IncorrectResults { trace, .. }
            | Self::DeadlockOrLivelock { trace, .. }
            | Self::ObstructionFreedomViolation { trace, .. }
            | Self::UnexpectedException { trace, .. }
            | Self::ValidationFailure { trace, .. } => trace.as_deref(),
        }
    }

    /// A short tag naming the failure kind, used by [`Self::render`]'s
    /// header line.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IncorrectResults { .. } => "IncorrectResults",
            Self::DeadlockOrLivelock { .. } => "DeadlockOrLivelock",
            Self::ObstructionFreedomViolation { .. } => "ObstructionFreedomViolation",
            Self::UnexpectedException { .. } => "UnexpectedException",
            Self::ValidationFailure { .. } => "ValidationFailure",
        }
    }

    /// Renders a human-readable report: a header naming the failure kind,
    /// followed by the rendered trace if one was captured (spec.md §4.7
    /// "The trace renderer emits a human-readable interleaving with one
    /// event per line prefixed by thread id").
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("{}\n", self.kind());
        match self {
            Self::ObstructionFreedomViolation { reason, .. } => {
                out.push_str(&format!("  {reason}\n"));
            }
            Self::UnexpectedException { message, .. } => {
                out.push_str(&format!("  {message}\n"));
            }
            Self::DeadlockOrLivelock { thread_dump, .. } => {
                for line in &thread_dump.threads {
                    out.push_str(&format!("  {line}\n"));
                }
            }
            Self::IncorrectResults { .. } | Self::ValidationFailure { .. } => {}
        }
        if let Some(trace) = self.trace() {
            out.push_str(&render_trace(trace));
        }
        out
    }
}

/// Renders a managed-strategy trace as one line per event, prefixed by
/// thread id (spec.md §4.7).
#[must_use]
pub fn render_trace(trace: &[TraceEvent]) -> String {
    trace
        .iter()
        .map(|event| {
            let loc = crate::util::codeloc::describe(event.location);
            match &event.detail {
                Some(detail) => format!("[thread {}] {:?} ({detail}) at {loc}\n", event.thread, event.kind),
                None => format!("[thread {}] {:?} at {loc}\n", event.thread, event.kind),
            }
        })
        .collect()
}
