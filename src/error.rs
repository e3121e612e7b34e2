//! Error types.
//!
//! Spec.md §7 distinguishes error *kinds* from ordinary invocation/failure
//! outcomes: [`DeclarationError`] and [`InfraError`] are the only two that
//! surface as Rust `Err` values and abort the run. `InvocationOutcome`
//! ([`crate::strategy::InvocationOutcome`]) and `Failure`
//! ([`crate::failure::Failure`]) are routine return values, not errors.

use thiserror::Error;

/// A test-declaration error: something wrong with how the class under test
/// was declared, detected before any scenario runs. Always aborts the run.
#[derive(Debug, Error)]
pub enum DeclarationError {
    /// Two state-representation functions were registered for one class.
    #[error("duplicate state-representation function (already registered: {first})")]
    DuplicateStateRepresentation {
        /// Name of the function registered first.
        first: &'static str,
    },
    /// A validation function declared parameters; validation functions must
    /// be zero-arg (spec.md §3 Scenario, §6 declared-operations contract).
    #[error("validation function `{name}` must take no parameters")]
    ValidationTakesParameters {
        /// Name of the offending validation function.
        name: String,
    },
    /// An actor referenced a parameter generator name that was never
    /// registered with the scenario.
    #[error("unknown parameter generator `{name}`")]
    UnknownParameterGenerator {
        /// The unresolved generator name.
        name: String,
    },
    /// A scenario violated a structural invariant (spec.md §3, §8 property 1)
    /// at construction time rather than being caught by the generator.
    #[error("malformed scenario: {reason}")]
    MalformedScenario {
        /// Human-readable description of which invariant was violated.
        reason: String,
    },
}

/// An infrastructure error: something failed that is not itself a
/// correctness question about the class under test.
#[derive(Debug, Error)]
pub enum InfraError {
    /// The sequential oracle's dispatch of an actor onto the specification
    /// instance failed for a reason other than a declared exception (e.g.
    /// the dispatch table has no entry for the operation id).
    #[error("sequential specification dispatch failed for operation `{operation}`: {message}")]
    OracleDispatchFailed {
        /// The operation that could not be dispatched.
        operation: String,
        /// Underlying description.
        message: String,
    },
    /// The stress strategy could not spin up its worker thread pool.
    #[error("failed to start stress-strategy thread pool ({threads} threads): {source}")]
    ThreadPoolStartFailed {
        /// Requested thread count.
        threads: usize,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// Loading a [`crate::config::CheckerConfig`] from a file failed.
    #[error("failed to load checker configuration: {0}")]
    ConfigLoad(String),
}

impl InfraError {
    /// Returns `true` when this looks like a thread/resource exhaustion
    /// failure rather than a logic bug, in which case callers should
    /// suggest raising OS thread limits before retrying.
    #[must_use]
    pub fn looks_like_resource_exhaustion(&self) -> bool {
        match self {
            Self::ThreadPoolStartFailed { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::OutOfMemory
            ) || source.raw_os_error() == Some(libc_eagain()),
            Self::OracleDispatchFailed { .. } | Self::ConfigLoad(_) => false,
        }
    }

    /// A human-readable remediation hint, populated only when
    /// [`Self::looks_like_resource_exhaustion`] is true.
    #[must_use]
    pub fn remediation_hint(&self) -> Option<&'static str> {
        if self.looks_like_resource_exhaustion() {
            Some(
                "this looks like an OS thread/resource limit; try raising \
                 RLIMIT_NPROC or lowering `CheckerConfig::threads`",
            )
        } else {
            None
        }
    }
}

/// Linux/macOS `EAGAIN`; used without pulling in `libc` for a single constant.
const fn libc_eagain() -> i32 {
    11
}

/// Unified error type for the checker's public API.
#[derive(Debug, Error)]
pub enum Error {
    /// See [`DeclarationError`].
    #[error(transparent)]
    Declaration(#[from] DeclarationError),
    /// See [`InfraError`].
    #[error(transparent)]
    Infra(#[from] InfraError),
    /// A reproduce-settings token failed to decode (spec.md §6, §8 property 8).
    #[error("invalid reproduce settings: {0}")]
    InvalidReproduceSettings(String),
    /// Reading or parsing a configuration file failed.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, Error>;
