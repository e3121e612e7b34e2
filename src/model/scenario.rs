//! Scenario model (spec.md §3 "Scenario", §8 property 1).

use crate::error::DeclarationError;
use crate::model::actor::Actor;

/// An init/parallel/post/validation tuple (spec.md §3 "Scenario").
///
/// Scenarios are immutable once constructed and may be replayed across
/// many invocations of the same iteration (spec.md §3 "Lifecycles").
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Actors run sequentially before the parallel part.
    pub init: Vec<Actor>,
    /// Per-thread ordered actor sequences run in parallel.
    pub parallel: Vec<Vec<Actor>>,
    /// Actors run sequentially after the parallel part.
    pub post: Vec<Actor>,
    /// Optional zero-arg validation actor run after init and after post.
    pub validation: Option<Actor>,
}

impl Scenario {
    /// Constructs a scenario, checking the structural invariants from
    /// spec.md §3/§8 property 1.
    ///
    /// # Errors
    ///
    /// Returns [`DeclarationError::MalformedScenario`] if:
    /// - a `run_once` actor appears more than once across the whole
    ///   scenario;
    /// - any parallel actor is suspendable and `init`/`post` are non-empty;
    /// - a `non_parallel`-group's actors are spread across more than one
    ///   parallel thread;
    /// - `validation` declares parameters (it must be zero-arg).
    pub fn new(
        init: Vec<Actor>,
        parallel: Vec<Vec<Actor>>,
        post: Vec<Actor>,
        validation: Option<Actor>,
    ) -> Result<Self, DeclarationError> {
        let scenario = Self { init, parallel, post, validation };
        scenario.check_invariants()?;
        Ok(scenario)
    }

    /// Total thread count in the parallel part.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.parallel.len()
    }

    /// Iterates every actor in the scenario, in no particular cross-part
    /// order (init, then each parallel thread, then post, then validation).
    pub fn all_actors(&self) -> impl Iterator<Item = &Actor> {
        self.init
            .iter()
            .chain(self.parallel.iter().flatten())
            .chain(self.post.iter())
            .chain(self.validation.iter())
    }

    fn check_invariants(&self) -> Result<(), DeclarationError> {
        if let Some(actor) = &self.validation {
            if !actor.args.is_empty() {
                return Err(DeclarationError::ValidationTakesParameters {
                    name: actor.operation.0.clone(),
                });
            }
        }

        let mut seen_run_once = std::collections::HashSet::new();
        for actor in self.all_actors() {
            if actor.run_once && !seen_run_once.insert(actor.operation.0.clone()) {
                return Err(DeclarationError::MalformedScenario {
                    reason: format!(
                        "run-once operation `{}` appears more than once",
                        actor.operation
                    ),
                });
            }
        }

        let has_suspendable_parallel = self.parallel.iter().flatten().any(|a| a.is_suspendable);
        if has_suspendable_parallel && (!self.init.is_empty() || !self.post.is_empty()) {
            return Err(DeclarationError::MalformedScenario {
                reason: "init/post must be empty when any parallel actor is suspendable".into(),
            });
        }

        let mut group_threads: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for (thread_idx, thread) in self.parallel.iter().enumerate() {
            for actor in thread {
                let Some(group) = &actor.group else { continue };
                if !actor.non_parallel {
                    continue;
                }
                match group_threads.get(&group.0) {
                    Some(&existing) if existing != thread_idx => {
                        return Err(DeclarationError::MalformedScenario {
                            reason: format!(
                                "non-parallel group `{}` spans more than one thread",
                                group.0
                            ),
                        });
                    }
                    _ => {
                        group_threads.insert(group.0.clone(), thread_idx);
                    }
                }
            }
        }

        Ok(())
    }
}
