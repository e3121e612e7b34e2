//! Greedy scenario minimizer (spec.md §4.6 "Minimizer", §8 property 6).
//!
//! One actor is deleted at a time, from init, from each parallel thread, or
//! from post; the candidate is kept only if the caller-supplied predicate
//! confirms the scenario still fails. The search stops at a fixed point
//! (no removal keeps the failure) or at a removal budget (spec.md §4.6
//! "Termination: fixed point or a removal budget").

use crate::model::scenario::Scenario;

/// Bounds on the minimizer's search.
#[derive(Debug, Clone, Copy)]
pub struct MinimizerBudget {
    /// Maximum number of actor removals to accept before giving up, even if
    /// the scenario has not yet reached a fixed point.
    pub max_removals: u32,
}

impl Default for MinimizerBudget {
    fn default() -> Self {
        Self { max_removals: 64 }
    }
}

/// Greedily reduces `scenario`, calling `still_fails` on every one-actor-
/// smaller candidate until none of them still fail (a fixed point) or
/// `budget.max_removals` is spent. Returns the smallest scenario found that
/// `still_fails` confirmed.
pub fn minimize(
    scenario: Scenario,
    budget: MinimizerBudget,
    mut still_fails: impl FnMut(&Scenario) -> bool,
) -> Scenario {
    let mut current = scenario;
    let mut removals = 0;

    while removals < budget.max_removals {
        match try_one_removal(&current, &mut still_fails) {
            Some(reduced) => {
                current = reduced;
                removals += 1;
            }
            None => break,
        }
    }

    current
}

fn try_one_removal(scenario: &Scenario, still_fails: &mut impl FnMut(&Scenario) -> bool) -> Option<Scenario> {
    removal_candidates(scenario).into_iter().find(|candidate| still_fails(candidate))
}

/// Every scenario obtained by deleting exactly one actor from `scenario`
/// (across init, every parallel thread, and post), skipping deletions that
/// would violate a scenario invariant (spec.md §3).
fn removal_candidates(scenario: &Scenario) -> Vec<Scenario> {
    let mut out = Vec::new();

    for i in 0..scenario.init.len() {
        let mut init = scenario.init.clone();
        init.remove(i);
        if let Ok(reduced) = Scenario::new(
            init,
            scenario.parallel.clone(),
            scenario.post.clone(),
            scenario.validation.clone(),
        ) {
            out.push(reduced);
        }
    }

    for (thread_idx, thread) in scenario.parallel.iter().enumerate() {
        for i in 0..thread.len() {
            let mut parallel = scenario.parallel.clone();
            parallel[thread_idx].remove(i);
            if let Ok(reduced) = Scenario::new(
                scenario.init.clone(),
                parallel,
                scenario.post.clone(),
                scenario.validation.clone(),
            ) {
                out.push(reduced);
            }
        }
    }

    for i in 0..scenario.post.len() {
        let mut post = scenario.post.clone();
        post.remove(i);
        if let Ok(reduced) = Scenario::new(
            scenario.init.clone(),
            scenario.parallel.clone(),
            post,
            scenario.validation.clone(),
        ) {
            out.push(reduced);
        }
    }

    out
}
