//! Sequential oracle (spec.md §4.2).
//!
//! Rust has no reflection, so "reflective dispatch" becomes an explicit
//! dispatch table built once per test class (spec.md §9 "Dynamic dispatch
//! on actors"): each [`OperationId`] maps to a closure
//! `(instance, args) -> OperationOutcome`.

use std::collections::HashMap;

use crate::error::InfraError;
use crate::model::actor::{Actor, OperationId};
use crate::model::result::{ActorResult, ResultValue};

/// What a dispatched operation produced, before the oracle maps it onto
/// [`ActorResult`] per the actor's declared exception contract.
pub enum OperationOutcome {
    /// A non-void return value.
    Value(ResultValue),
    /// A void-returning operation completed.
    Void,
    /// A suspendable operation suspended without completing synchronously.
    Suspended,
    /// The operation "threw"; carries the canonical exception class name.
    Thrown(String),
}

type DispatchFn<T> = Box<dyn Fn(&mut T, &[ResultValue]) -> OperationOutcome + Send + Sync>;
type ResumeFn<T> = Box<dyn Fn(&mut T) -> OperationOutcome + Send + Sync>;

/// A sequential specification's operation dispatch table plus optional
/// state-representation and validation hooks (spec.md §6 "Declared-operations
/// contract").
pub struct SequentialOracle<T> {
    dispatch: HashMap<OperationId, DispatchFn<T>>,
    resume: HashMap<OperationId, ResumeFn<T>>,
    state_representation: Option<Box<dyn Fn(&T) -> String + Send + Sync>>,
}

impl<T> Default for SequentialOracle<T> {
    fn default() -> Self {
        Self { dispatch: HashMap::new(), resume: HashMap::new(), state_representation: None }
    }
}

impl<T> SequentialOracle<T> {
    /// Creates an empty oracle with no registered operations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the dispatch closure for `operation`.
    #[must_use]
    pub fn with_operation(
        mut self,
        operation: impl Into<String>,
        dispatch: impl Fn(&mut T, &[ResultValue]) -> OperationOutcome + Send + Sync + 'static,
    ) -> Self {
        self.dispatch.insert(OperationId::new(operation), Box::new(dispatch));
        self
    }

    /// Registers the resumption closure for a suspendable `operation`
    /// (spec.md §9 "Suspension / continuations"): called when the verifier
    /// or the managed strategy resumes a previously-suspended actor of this
    /// operation, instead of re-dispatching it with its original arguments.
    #[must_use]
    pub fn with_resumption(
        mut self,
        operation: impl Into<String>,
        resume: impl Fn(&mut T) -> OperationOutcome + Send + Sync + 'static,
    ) -> Self {
        self.resume.insert(OperationId::new(operation), Box::new(resume));
        self
    }

    /// Whether `operation` has a registered resumption closure.
    #[must_use]
    pub fn has_resumption(&self, operation: &OperationId) -> bool {
        self.resume.contains_key(operation)
    }

    /// Invokes the registered resumption closure for `actor`'s operation.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::OracleDispatchFailed`] if no resumption closure
    /// is registered for the operation.
    pub fn resume(&self, instance: &mut T, actor: &Actor) -> Result<ActorResult, InfraError> {
        let resume = self.resume.get(&actor.operation).ok_or_else(|| InfraError::OracleDispatchFailed {
            operation: actor.operation.0.clone(),
            message: "no resumption entry registered for this suspendable operation".into(),
        })?;
        Ok(Self::map_outcome(actor, resume(instance))?)
    }

    /// Registers the (at most one) state-representation function (spec.md
    /// §6); used only for human-readable failure traces, never for
    /// equality.
    #[must_use]
    pub fn with_state_representation(
        mut self,
        f: impl Fn(&T) -> String + Send + Sync + 'static,
    ) -> Self {
        self.state_representation = Some(Box::new(f));
        self
    }

    /// Renders the instance's state-representation string, if one was
    /// registered.
    #[must_use]
    pub fn describe_state(&self, instance: &T) -> Option<String> {
        self.state_representation.as_ref().map(|f| f(instance))
    }

    /// Dispatches `actor` onto `instance` and maps the outcome onto
    /// [`ActorResult`] following spec.md §4.2's return-value mapping.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::OracleDispatchFailed`] when the operation is
    /// unregistered, or when the dispatched operation throws an exception
    /// class the actor does not declare in `handled_exceptions` — spec.md
    /// §4.2: "any other thrown throwable -> bubbled as a fatal oracle
    /// error".
    pub fn apply(&self, instance: &mut T, actor: &Actor) -> Result<ActorResult, InfraError> {
        let dispatch = self.dispatch.get(&actor.operation).ok_or_else(|| {
            InfraError::OracleDispatchFailed {
                operation: actor.operation.0.clone(),
                message: "no dispatch entry registered for this operation".into(),
            }
        })?;

        Self::map_outcome(actor, dispatch(instance, &actor.args))
    }

    fn map_outcome(actor: &Actor, outcome: OperationOutcome) -> Result<ActorResult, InfraError> {
        match outcome {
            OperationOutcome::Void => Ok(ActorResult::Void),
            OperationOutcome::Value(v) => Ok(ActorResult::Value(v)),
            OperationOutcome::Suspended => {
                if actor.is_suspendable {
                    Ok(ActorResult::Suspended)
                } else {
                    Err(InfraError::OracleDispatchFailed {
                        operation: actor.operation.0.clone(),
                        message: "non-suspendable actor returned a suspension sentinel".into(),
                    })
                }
            }
            OperationOutcome::Thrown(class) => {
                if actor.handles(&class) {
                    Ok(ActorResult::Exception(class))
                } else {
                    Err(InfraError::OracleDispatchFailed {
                        operation: actor.operation.0.clone(),
                        message: format!("undeclared exception `{class}` thrown"),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::actor::ActorTemplate;

    struct Counter {
        value: i64,
    }

    fn oracle() -> SequentialOracle<Counter> {
        SequentialOracle::new()
            .with_operation("incAndGet", |c, _args| {
                c.value += 1;
                OperationOutcome::Value(ResultValue::Int(c.value))
            })
            .with_operation("get", |c, _args| OperationOutcome::Value(ResultValue::Int(c.value)))
            .with_operation("pop", |_c, _args| OperationOutcome::Thrown("EmptyQueueError".into()))
            .with_state_representation(|c| format!("Counter({})", c.value))
    }

    #[test]
    fn dispatches_registered_operation() {
        let o = oracle();
        let mut c = Counter { value: 0 };
        let template = ActorTemplate::new("incAndGet");
        let actor = Actor::from_template(0, &template, vec![]);
        let result = o.apply(&mut c, &actor).unwrap();
        assert_eq!(result, ActorResult::Value(ResultValue::Int(1)));
    }

    #[test]
    fn unregistered_operation_is_infra_error() {
        let o = oracle();
        let mut c = Counter { value: 0 };
        let template = ActorTemplate::new("unknown");
        let actor = Actor::from_template(0, &template, vec![]);
        assert!(o.apply(&mut c, &actor).is_err());
    }

    #[test]
    fn declared_exception_becomes_result() {
        let o = oracle();
        let mut c = Counter { value: 0 };
        let template = ActorTemplate::new("pop").handles_exception("EmptyQueueError");
        let actor = Actor::from_template(0, &template, vec![]);
        let result = o.apply(&mut c, &actor).unwrap();
        assert_eq!(result, ActorResult::Exception("EmptyQueueError".into()));
    }

    #[test]
    fn undeclared_exception_bubbles_as_fatal_error() {
        let o = oracle();
        let mut c = Counter { value: 0 };
        let template = ActorTemplate::new("pop");
        let actor = Actor::from_template(0, &template, vec![]);
        assert!(o.apply(&mut c, &actor).is_err());
    }

    #[test]
    fn state_representation_is_available() {
        let o = oracle();
        let c = Counter { value: 9 };
        assert_eq!(o.describe_state(&c), Some("Counter(9)".to_string()));
    }
}
