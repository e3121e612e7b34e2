//! Actor model (spec.md §3 "Actor", §6 "Declared-operations contract").

use crate::model::result::ResultValue;
use std::collections::BTreeSet;

/// Identifies a declared operation by name. Ordering is by name, the
/// primary key of the deterministic method order spec.md §4.1 requires.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationId(pub String);

impl OperationId {
    /// Wraps a static operation name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An operation group (spec.md §3, §4.1, §6): a named set of operations
/// that share scheduling constraints.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(pub String);

/// A template from which concrete [`Actor`]s are drawn by the generator.
///
/// This is the declared-operation half of the "declared-operations
/// contract" (spec.md §6): parameter generation itself is out of scope
/// (spec.md §1 Non-goals — "parameter generators for primitive types"), so
/// a template carries a fixed, finite pool of pre-built argument tuples
/// rather than a generator function.
#[derive(Debug, Clone)]
pub struct ActorTemplate {
    /// Operation identifier.
    pub operation: OperationId,
    /// Names of the parameter types, in declaration order; joined with
    /// `,` to form the deterministic secondary sort key (spec.md §4.1).
    pub param_type_names: Vec<String>,
    /// Candidate argument tuples the generator may pick from.
    pub arg_pool: Vec<Vec<ResultValue>>,
    /// Operation group this actor belongs to, if any.
    pub group: Option<GroupId>,
    /// Whether `group`'s actors may occupy at most one parallel thread per
    /// scenario (spec.md §4.1, §8 property 1).
    pub non_parallel: bool,
    /// May this actor appear at most once across the whole scenario.
    pub run_once: bool,
    /// Is this actor's operation suspendable (spec.md §9 "Suspension").
    pub is_suspendable: bool,
    /// If suspended, may the sequential replay observe `Cancelled`.
    pub cancel_on_suspension: bool,
    /// Permits the sequential replay to re-suspend where the observed
    /// result is a value (spec.md §4.3).
    pub allow_extra_suspension: bool,
    /// This actor blocks its thread until some condition is met.
    pub blocking: bool,
    /// This actor may cause *another* actor to block.
    pub causes_blocking: bool,
    /// Cancellation of a suspension must take effect before any partial
    /// side effect is observed.
    pub prompt_cancellation: bool,
    /// Exception class names this actor's result may legally be.
    pub handled_exceptions: BTreeSet<String>,
}

impl ActorTemplate {
    /// Starts building a non-suspendable, non-blocking actor template with
    /// a single no-argument invocation shape.
    #[must_use]
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: OperationId::new(operation),
            param_type_names: Vec::new(),
            arg_pool: vec![Vec::new()],
            group: None,
            non_parallel: false,
            run_once: false,
            is_suspendable: false,
            cancel_on_suspension: false,
            allow_extra_suspension: false,
            blocking: false,
            causes_blocking: false,
            prompt_cancellation: false,
            handled_exceptions: BTreeSet::new(),
        }
    }

    /// The deterministic sort key from spec.md §4.1: method name, then
    /// parameter type names joined by a fixed delimiter.
    #[must_use]
    pub fn sort_key(&self) -> String {
        format!("{}|{}", self.operation.0, self.param_type_names.join(","))
    }

    /// Builder: sets the argument pool.
    #[must_use]
    pub fn with_args(mut self, arg_pool: Vec<Vec<ResultValue>>) -> Self {
        self.arg_pool = arg_pool;
        self
    }

    /// Builder: assigns an operation group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>, non_parallel: bool) -> Self {
        self.group = Some(GroupId(group.into()));
        self.non_parallel = non_parallel;
        self
    }

    /// Builder: marks the actor as appearing at most once per scenario.
    #[must_use]
    pub const fn run_once(mut self, run_once: bool) -> Self {
        self.run_once = run_once;
        self
    }

    /// Builder: marks the actor as suspendable.
    #[must_use]
    pub const fn suspendable(mut self, cancel_on_suspension: bool) -> Self {
        self.is_suspendable = true;
        self.cancel_on_suspension = cancel_on_suspension;
        self
    }

    /// Builder: adds an exception class name this actor may legally throw.
    #[must_use]
    pub fn handles_exception(mut self, class: impl Into<String>) -> Self {
        self.handled_exceptions.insert(class.into());
        self
    }
}

/// A concrete, scenario-placed invocation of a declared operation
/// (spec.md §3 "Actor").
#[derive(Debug, Clone)]
pub struct Actor {
    /// Stable identity within the owning scenario (index into a flat
    /// actor table); used by the verifier to key resumptions.
    pub id: usize,
    /// Which template this actor was drawn from.
    pub operation: OperationId,
    /// Concrete argument values.
    pub args: Vec<ResultValue>,
    /// Operation group, if any.
    pub group: Option<GroupId>,
    /// Copied from the template at generation time.
    pub run_once: bool,
    /// See [`ActorTemplate::is_suspendable`].
    pub is_suspendable: bool,
    /// See [`ActorTemplate::cancel_on_suspension`].
    pub cancel_on_suspension: bool,
    /// See [`ActorTemplate::allow_extra_suspension`].
    pub allow_extra_suspension: bool,
    /// See [`ActorTemplate::blocking`].
    pub blocking: bool,
    /// See [`ActorTemplate::causes_blocking`].
    pub causes_blocking: bool,
    /// See [`ActorTemplate::prompt_cancellation`].
    pub prompt_cancellation: bool,
    /// See [`ActorTemplate::handled_exceptions`].
    pub handled_exceptions: BTreeSet<String>,
}

impl Actor {
    /// Builds a concrete actor from a template and a chosen argument tuple.
    #[must_use]
    pub fn from_template(id: usize, template: &ActorTemplate, args: Vec<ResultValue>) -> Self {
        Self {
            id,
            operation: template.operation.clone(),
            args,
            group: template.group.clone(),
            run_once: template.run_once,
            is_suspendable: template.is_suspendable,
            cancel_on_suspension: template.cancel_on_suspension,
            allow_extra_suspension: template.allow_extra_suspension,
            blocking: template.blocking,
            causes_blocking: template.causes_blocking,
            prompt_cancellation: template.prompt_cancellation,
            handled_exceptions: template.handled_exceptions.clone(),
        }
    }

    /// Does `class` match one of this actor's declared handled exceptions.
    #[must_use]
    pub fn handles(&self, class: &str) -> bool {
        self.handled_exceptions.contains(class)
    }
}
