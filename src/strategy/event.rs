//! The instrumentation contract (spec.md §6 "Instrumentation contract
//! (consumed)").
//!
//! Bytecode instrumentation that hooks monitor-enter/exit, field/array
//! accesses, park/unpark, wait/notify and random-number generation is
//! explicitly out of scope (spec.md §1 Non-goals) — the core only
//! *consumes* an [`EventTracker`] capability and declares what events the
//! tracker must deliver. Code under test calls these methods directly (the
//! nearest idiomatic Rust analogue of a rewritten-bytecode callback, since
//! this crate ships no bytecode rewriter).

use crate::util::codeloc::CodeLocationId;

/// One event the managed strategy's scheduler may treat as a switch-point
/// (spec.md §4.5 "switch-points are heap reads/writes, monitor operations,
/// park/unpark, wait/notify, atomic method calls, deterministic-random
/// draws, and method entries into user classes").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchPointKind {
    /// A monitor (lock) was acquired.
    Lock,
    /// A monitor (lock) was released.
    Unlock,
    /// The current thread parked.
    Park,
    /// The current thread unparked another.
    Unpark,
    /// The current thread waited on a monitor, optionally with a timeout.
    Wait {
        /// Whether the wait carries a timeout.
        with_timeout: bool,
    },
    /// The current thread notified waiters on a monitor.
    Notify {
        /// Whether all waiters were notified (`notify_all`) or just one.
        all: bool,
    },
    /// A shared field or array element is about to be read.
    BeforeRead,
    /// A shared field or array element is about to be written.
    BeforeWrite,
    /// An atomic-typed method is about to be called.
    BeforeAtomicMethodCall,
    /// A method on a user class is about to be entered.
    BeforeMethodCall,
    /// A deterministic random draw was requested.
    RandomNextInt,
}

/// A single recorded event, for trace rendering (spec.md §4.7 "an ordered
/// list of events with code-location stack frames").
#[derive(Debug, Clone)]
pub struct TraceEvent {
    /// Which simulated thread produced this event.
    pub thread: usize,
    /// What kind of switch-point this was.
    pub kind: SwitchPointKind,
    /// The code location the event was reported from.
    pub location: CodeLocationId,
    /// Optional human-readable detail (e.g. the read value, the method name).
    pub detail: Option<String>,
}

/// The capability code under test reports every potentially-shared event
/// through (spec.md §6).
///
/// Implemented by [`crate::strategy::managed::ManagedEventTracker`]; the
/// stress strategy hands out a no-op implementation since it never needs
/// to intercept individual memory events (spec.md §4.4 — the stress
/// strategy relies on real thread scheduling, not event interception).
pub trait EventTracker: Send + Sync {
    /// A monitor was locked at `loc`.
    fn lock(&self, loc: CodeLocationId);
    /// A monitor was unlocked at `loc`.
    fn unlock(&self, loc: CodeLocationId);
    /// The current thread parked at `loc`.
    fn park(&self, loc: CodeLocationId);
    /// The current thread unparked `thread` from `loc`.
    fn unpark(&self, thread: usize, loc: CodeLocationId);
    /// The current thread waited on a monitor at `loc`.
    fn wait(&self, loc: CodeLocationId, with_timeout: bool);
    /// The current thread notified waiters at `loc`.
    fn notify(&self, loc: CodeLocationId, all: bool);
    /// About to read a shared field or array element.
    fn before_read(&self, loc: CodeLocationId);
    /// About to write a shared field or array element.
    fn before_write(&self, loc: CodeLocationId);
    /// A read completed with `value`; returns the value unchanged (the
    /// scheduler has no reason to alter the actual memory value — it only
    /// uses this call as a switch-point observation).
    fn after_read(&self, value: &str) -> String {
        value.to_string()
    }
    /// A write completed.
    fn after_write(&self) {}
    /// About to invoke `method` on `owner` (a class name), from `loc`.
    fn before_method_call(&self, owner: &str, method: &str, loc: CodeLocationId);
    /// About to invoke an atomic-typed method from `loc`.
    fn before_atomic_method_call(&self, loc: CodeLocationId);
    /// A method call finished successfully.
    fn on_method_call_finished_successfully(&self) {}
    /// A method call threw; `message` is a human-readable description.
    fn on_method_call_threw_exception(&self, message: &str) {
        let _ = message;
    }
    /// A new object was created (used for local-object tracking, spec.md
    /// §4.5 "Local-object tracking").
    fn on_new_object_creation(&self) {}
    /// Records that `receiver` now reaches an object previously reachable
    /// only from elsewhere, so that object must be marked shared (spec.md
    /// §4.5 "a new object starts local and is marked shared the first
    /// time it is reachable from a previously-shared receiver").
    fn add_dependency(&self, receiver_is_shared: bool) -> bool {
        receiver_is_shared
    }
    /// The code under test drew from a deterministic random source.
    fn random_next_int(&self, loc: CodeLocationId) -> i32;
    /// Enters an ignored section (spec.md §4.5, §9 "Ignored section").
    fn enter_ignored_section(&self);
    /// Leaves an ignored section.
    fn leave_ignored_section(&self);
}
