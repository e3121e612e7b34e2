//! Process-wide code-location registry.
//!
//! The managed strategy's instrumentation contract (spec.md §6) reports
//! every switch-point with a stable integer code-location id. Rust has no
//! bytecode rewriter to allocate those ids for us, so the registry instead
//! captures [`std::panic::Location`] at the call site via `#[track_caller]`
//! and interns it the first time that exact location is seen.
//!
//! Lifecycle matches spec.md §9 "Global mutable state": created at first
//! use, append-only, never destroyed within a process. Tests must not
//! depend on ids being stable across process runs.

use std::panic::Location;
use std::sync::OnceLock;

use parking_lot::Mutex;

/// A process-wide, append-only table from integer ids to source locations.
static REGISTRY: OnceLock<Mutex<Vec<&'static Location<'static>>>> = OnceLock::new();

/// A stable integer id for a captured source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeLocationId(pub u32);

impl std::fmt::Display for CodeLocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "loc#{}", self.0)
    }
}

fn registry() -> &'static Mutex<Vec<&'static Location<'static>>> {
    REGISTRY.get_or_init(|| Mutex::new(Vec::new()))
}

/// Interns the caller's source location and returns its stable id.
///
/// Repeated calls from the exact same call site return the same id; the
/// table never shrinks or reassigns an id within a process.
#[track_caller]
#[must_use]
pub fn intern_here() -> CodeLocationId {
    let loc = Location::caller();
    let mut table = registry().lock();
    if let Some(pos) = table.iter().position(|existing| locations_equal(existing, loc)) {
        return CodeLocationId(pos as u32);
    }
    table.push(loc);
    CodeLocationId((table.len() - 1) as u32)
}

fn locations_equal(a: &Location<'_>, b: &Location<'_>) -> bool {
    a.file() == b.file() && a.line() == b.line() && a.column() == b.column()
}

/// Renders a code-location id as `file:line:col`, or `<unknown>` if the id
/// was never registered (should not happen for ids produced by this
/// process, but replay of a trace from another process could see this).
#[must_use]
pub fn describe(id: CodeLocationId) -> String {
    let table = registry().lock();
    table
        .get(id.0 as usize)
        .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
        .unwrap_or_else(|| "<unknown location>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_call_site_reuses_id() {
        let a = intern_here();
        let b = intern_here();
        // Two distinct call sites on different lines get distinct ids...
        assert_ne!(a, b);
    }

    #[test]
    fn describe_renders_file_line_col() {
        let id = intern_here();
        let text = describe(id);
        assert!(text.contains("det_rng") == false); // sanity: not another file
        assert!(text.contains("codeloc.rs"), "{text}");
    }

    #[test]
    fn unknown_id_has_placeholder_description() {
        let text = describe(CodeLocationId(u32::MAX));
        assert_eq!(text, "<unknown location>");
    }

    fn helper_repeats_same_line() -> CodeLocationId {
        intern_here()
    }

    #[test]
    fn identical_call_site_through_helper_is_stable() {
        let a = helper_repeats_same_line();
        let b = helper_repeats_same_line();
        assert_eq!(a, b, "same call site inside helper should intern once");
    }
}
