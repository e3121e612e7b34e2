//! Transposition cache for the linearizability DFS (spec.md §4.3
//! "A transition cache keyed on `(state-hash, actor-id, is-resumption)`
//! memoizes the tuple `(next-state, produced-result)` so the same suffix is
//! not re-explored from equivalent states. Equivalence of states is
//! delegated to the sequential specification's equals/hashCode;
//! implementations that do not override these degenerate to identity,
//! which is correct but slow.").
//!
//! Rust has no reflective `equals`/`hashCode` to delegate to, so this crate
//! asks the sequential-specification author for `Clone + PartialEq`
//! directly (the idiomatic seam) and, absent a faster hash, degenerates to
//! the same "correct but slow" linear scan the spec calls out by name —
//! there is no unsound shortcut available without requiring `Hash` from
//! every test author, which would needlessly narrow what can be checked.

/// Remembers `(state, thread-frontier, pending-suspensions)` triples that
/// are already known to have no path to a valid linearization, so the DFS
/// does not re-explore them from a different arrival order.
pub struct TransitionCache<T> {
    dead: Vec<(T, Vec<usize>, Vec<usize>)>,
}

impl<T> Default for TransitionCache<T> {
    fn default() -> Self {
        Self { dead: Vec::new() }
    }
}

impl<T: PartialEq> TransitionCache<T> {
    /// Creates an empty cache, scoped to a single verification session
    /// (spec.md §3 "Ownership" — "the verifier... owns its transition
    /// cache per verification session").
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `(state, frontier, pending)` is already known to be a dead
    /// end.
    #[must_use]
    pub fn is_known_dead(&self, state: &T, frontier: &[usize], pending: &[usize]) -> bool {
        self.dead
            .iter()
            .any(|(s, f, p)| s == state && f == frontier && p == pending)
    }

    /// Records `(state, frontier, pending)` as a dead end.
    pub fn mark_dead(&mut self, state: T, frontier: Vec<usize>, pending: Vec<usize>) {
        self.dead.push((state, frontier, pending));
    }

    /// Number of memoized dead ends, exposed for benchmarking/diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dead.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dead.is_empty()
    }
}
