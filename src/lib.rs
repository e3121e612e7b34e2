//! `actorcheck`: a randomized linearizability checker for user-defined
//! concurrent data structures (spec.md §1).
//!
//! Given a class under test that declares its operations and a sequential
//! specification, this crate generates randomized parallel scenarios, runs
//! them under a stress strategy (real thread scheduling) or a managed
//! strategy (deterministic interleaving exploration), and verifies every
//! observed execution against the sequential specification with a
//! linearizability verifier. See `SPEC_FULL.md` and `DESIGN.md` for the
//! full design.

pub mod config;
pub mod error;
pub mod failure;
pub mod generator;
pub mod model;
pub mod observability;
pub mod oracle;
pub mod run;
pub mod seed;
pub mod strategy;
pub mod util;
pub mod verifier;

use std::marker::PhantomData;

use crate::model::actor::ActorTemplate;
use crate::oracle::SequentialOracle;
use crate::strategy::Snapshot;

/// Declares everything the checker needs to test a concurrent data
/// structure (spec.md §6 "Declared-operations contract").
///
/// Rust has no reflection, so the declaration surface that a JVM-hosted
/// checker would discover via annotations is instead three small
/// associated items: a fresh-instance factory, the pool of declared
/// operations, and the dispatch table that connects them (spec.md §9
/// "Dynamic dispatch on actors").
pub trait CheckedType: Clone + PartialEq + Snapshot + Send + 'static {
    /// Builds a fresh instance, the sequential specification's initial
    /// state (spec.md §3 "a freshly constructed sequential-specification
    /// instance").
    fn new_instance() -> Self;

    /// The pool of declared operations this type supports (spec.md §4.1).
    fn operations() -> Vec<ActorTemplate>;

    /// Builds the dispatch table mapping each declared operation onto this
    /// type (spec.md §4.2).
    fn oracle() -> SequentialOracle<Self>
    where
        Self: Sized;

    /// An optional zero-arg validation actor, attached to every generated
    /// scenario (spec.md §3 "Scenario", §4.6): its result is checked before
    /// linearizability verification, and an exception from it is reported
    /// as [`crate::failure::Failure::ValidationFailure`] instead of an
    /// ordinary verification failure.
    ///
    /// Defaults to `None`: most checked types have no structural invariant
    /// beyond what the sequential specification's operations themselves
    /// enforce.
    fn validation() -> Option<ActorTemplate> {
        None
    }
}

/// Runs a configured sequence of checks against a [`CheckedType`].
pub struct Checker<T: CheckedType> {
    config: config::CheckerConfig,
    _marker: PhantomData<T>,
}

impl<T: CheckedType> Checker<T> {
    /// Builds a checker from `config`.
    #[must_use]
    pub fn new(config: config::CheckerConfig) -> Self {
        Self { config, _marker: PhantomData }
    }

    /// Runs the check, seeding the run from a fresh, process-local source
    /// of entropy.
    ///
    /// To reproduce a previously reported failure, recover its seed from
    /// the rendered [`run::CheckReport`] and replay with
    /// [`Self::check_with_seed`] (spec.md §8 property 8).
    #[must_use]
    pub fn check(&self) -> run::CheckReport {
        self.check_with_seed(fresh_seed())
    }

    /// Runs the check with an explicit top-level seed.
    #[must_use]
    pub fn check_with_seed(&self, run_seed: u64) -> run::CheckReport {
        match run::run::<T>(&self.config, run_seed, &run::NoopTracker) {
            Ok(report) => report,
            Err(err) => run::CheckReport {
                iterations_run: 0,
                stats: run::RunStats::default(),
                outcome: run::CheckOutcome::Aborted(err.to_string()),
            },
        }
    }

    /// Runs the check with an explicit top-level seed and tracker, for
    /// callers that want iteration/invocation observability (spec.md §4.6
    /// "RunTracker").
    #[must_use]
    pub fn check_with_tracker(&self, run_seed: u64, tracker: &dyn run::RunTracker) -> run::CheckReport {
        match run::run::<T>(&self.config, run_seed, tracker) {
            Ok(report) => report,
            Err(err) => run::CheckReport {
                iterations_run: 0,
                stats: run::RunStats::default(),
                outcome: run::CheckOutcome::Aborted(err.to_string()),
            },
        }
    }
}

fn fresh_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Common imports for declaring and running checks.
pub mod prelude {
    pub use crate::config::{CheckerConfig, CheckerConfigBuilder};
    pub use crate::failure::Failure;
    pub use crate::run::CheckReport;
    pub use crate::seed::ReproduceSettings;
    pub use crate::strategy::Snapshot;
    pub use crate::{CheckedType, Checker};
}
