//! Result model (spec.md §3 "Result", §6 "Result contract").

use std::fmt;

/// A normalized exception class name, used for structural equality on
/// `Result::Exception` (spec.md §4.3 "Exception equivalence uses canonical
/// class names only").
pub type ExceptionClass = String;

/// The outcome of applying a single actor.
///
/// Equality follows spec.md §6: deep-by-value for `Value`, structural on
/// the class name for `Exception`, identity-like (derived `PartialEq`) for
/// the singleton variants.
#[derive(Debug, Clone)]
pub enum ActorResult {
    /// A non-void return value.
    Value(ResultValue),
    /// A void-returning operation completed.
    Void,
    /// A suspendable actor suspended without completing synchronously.
    Suspended,
    /// A suspended actor was cancelled instead of resumed.
    Cancelled,
    /// A declared exception was thrown and caught by `handledExceptions`.
    Exception(ExceptionClass),
    /// No result is available (e.g. an invocation that never completed).
    NoResult,
    /// Internal-only: a previously suspended actor resumed with a value.
    /// Never produced by the sequential oracle directly; only used while
    /// the verifier threads suspension/resumption together.
    ResumedResult {
        /// Identity of the actor whose suspension this resumes.
        resumed_actor: usize,
        /// The value the suspension point was given on resumption.
        value: ResultValue,
    },
}

impl PartialEq for ActorResult {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Void, Self::Void)
            | (Self::Suspended, Self::Suspended)
            | (Self::Cancelled, Self::Cancelled)
            | (Self::NoResult, Self::NoResult) => true,
            (Self::Exception(a), Self::Exception(b)) => a == b,
            (
                Self::ResumedResult { resumed_actor: ra, value: va },
                Self::ResumedResult { resumed_actor: rb, value: vb },
            ) => ra == rb && va == vb,
            _ => false,
        }
    }
}

impl Eq for ActorResult {}

impl fmt::Display for ActorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Void => write!(f, "void"),
            Self::Suspended => write!(f, "suspended"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Exception(class) => write!(f, "{class}"),
            Self::NoResult => write!(f, "no-result"),
            Self::ResumedResult { value, .. } => write!(f, "resumed({value})"),
        }
    }
}

/// A dynamically-typed value produced by a declared operation.
///
/// Declared operations are authored in Rust, so there is no reflective
/// boxed-`Object` equivalent; [`ResultValue`] is a small closed set of
/// shapes wide enough for the scenarios in spec.md §8 (counters, queues,
/// locks, suspension payloads) without pulling in an open-ended `Any`-based
/// scheme that would make verifier-side equality unreliable.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    /// Unit/empty payload (e.g. a suspendable actor resuming with `()`).
    Unit,
    /// A signed integer value.
    Int(i64),
    /// A boolean value.
    Bool(bool),
    /// A UTF-8 string value.
    Str(String),
    /// `None`/`null`-shaped payload distinct from [`Self::Unit`] (e.g. an
    /// empty-queue `poll`).
    Null,
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "()"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for ResultValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for ResultValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for ResultValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl<T> From<Option<T>> for ResultValue
where
    T: Into<ResultValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_equality_is_deep() {
        assert_eq!(
            ActorResult::Value(ResultValue::Int(5)),
            ActorResult::Value(ResultValue::Int(5))
        );
        assert_ne!(
            ActorResult::Value(ResultValue::Int(5)),
            ActorResult::Value(ResultValue::Int(6))
        );
    }

    #[test]
    fn exception_equality_is_structural_on_class_name() {
        assert_eq!(
            ActorResult::Exception("IllegalStateError".into()),
            ActorResult::Exception("IllegalStateError".into())
        );
        assert_ne!(
            ActorResult::Exception("IllegalStateError".into()),
            ActorResult::Exception("OtherError".into())
        );
    }

    #[test]
    fn singleton_variants_are_identity_like() {
        assert_eq!(ActorResult::Void, ActorResult::Void);
        assert_ne!(ActorResult::Void, ActorResult::NoResult);
        assert_ne!(ActorResult::Suspended, ActorResult::Cancelled);
    }

    #[test]
    fn option_conversion_maps_none_to_null() {
        let v: ResultValue = Option::<i64>::None.into();
        assert_eq!(v, ResultValue::Null);
        let v: ResultValue = Some(3i64).into();
        assert_eq!(v, ResultValue::Int(3));
    }
}
