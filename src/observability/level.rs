//! Log level, grounded on the teacher's `observability::level` module.

use serde::{Deserialize, Serialize};

/// Severity of a log record, ordered from most to least chatty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-event detail: every actor dispatch, every switch point.
    Trace,
    /// Iteration/invocation lifecycle and generator decisions.
    Debug,
    /// Run-level summaries (iterations completed, failure found).
    Info,
    /// Recoverable anomalies (slow invocation, retry).
    Warn,
    /// Run-terminating conditions.
    Error,
}

impl LogLevel {
    /// Returns `true` if `self` is at least as severe as `threshold`.
    #[must_use]
    pub const fn is_at_least(self, threshold: Self) -> bool {
        (self as u8) >= (threshold as u8)
    }

    /// Short uppercase name (`"TRACE"`, `"WARN"`, ...), matching the
    /// teacher's `as_str` convention.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    /// Single-character tag, for compact trace rendering.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Trace => 'T',
            Self::Debug => 'D',
            Self::Info => 'I',
            Self::Warn => 'W',
            Self::Error => 'E',
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Warn
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_severity_order() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn is_at_least_matches_ordering() {
        assert!(LogLevel::Error.is_at_least(LogLevel::Info));
        assert!(!LogLevel::Info.is_at_least(LogLevel::Error));
        assert!(LogLevel::Warn.is_at_least(LogLevel::Warn));
    }

    #[test]
    fn as_str_and_char_are_stable_identifiers() {
        assert_eq!(LogLevel::Warn.as_str(), "WARN");
        assert_eq!(LogLevel::Warn.as_char(), 'W');
    }

    #[test]
    fn default_is_warn() {
        assert_eq!(LogLevel::default(), LogLevel::Warn);
    }
}
