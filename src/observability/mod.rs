//! Structured logging (SPEC_FULL.md §10.1).
//!
//! Grounded on the teacher's `observability` module: a small `LogLevel`
//! enum gates what gets emitted, and the actual emission goes through
//! `tracing`'s macros behind the `tracing-integration` feature so the
//! verifier's hot loops pay zero cost when logging is compiled out.

mod level;

pub use level::LogLevel;

/// Emits a pre-formatted log line at the given level through `tracing`, if
/// the `tracing-integration` feature is enabled; otherwise a no-op.
///
/// Not public API — callers format their message first (via
/// [`format_args!`]/`format!`) so this function stays a single non-generic
/// symbol regardless of call site.
#[doc(hidden)]
#[cfg(feature = "tracing-integration")]
pub fn emit(level: LogLevel, target: &str, message: &str) {
    match level {
        LogLevel::Trace => tracing::trace!(target: "actorcheck", src = target, "{message}"),
        LogLevel::Debug => tracing::debug!(target: "actorcheck", src = target, "{message}"),
        LogLevel::Info => tracing::info!(target: "actorcheck", src = target, "{message}"),
        LogLevel::Warn => tracing::warn!(target: "actorcheck", src = target, "{message}"),
        LogLevel::Error => tracing::error!(target: "actorcheck", src = target, "{message}"),
    }
}

#[cfg(not(feature = "tracing-integration"))]
#[doc(hidden)]
pub fn emit(_level: LogLevel, _target: &str, _message: &str) {}

/// Logs a message at the given [`LogLevel`] through [`emit`].
///
/// The format arguments are not evaluated at all when `tracing-integration`
/// is disabled, so this macro is free to sprinkle through hot paths.
#[macro_export]
macro_rules! log_at {
    ($level:expr, $($arg:tt)*) => {
        #[cfg(feature = "tracing-integration")]
        $crate::observability::emit($level, module_path!(), &format!($($arg)*));
    };
}

/// Installs a `tracing-subscriber` `EnvFilter` subscriber for tests.
///
/// Only available with `test-internals`. Safe to call more than once; the
/// second and subsequent calls are ignored.
#[cfg(feature = "test-internals")]
pub fn install_test_subscriber() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering_matches_severity() {
        assert!(LogLevel::Error.is_at_least(LogLevel::Warn));
        assert!(!LogLevel::Trace.is_at_least(LogLevel::Info));
    }
}
