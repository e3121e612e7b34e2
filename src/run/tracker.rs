//! Run tracker (spec.md §4.6): observability hooks into the iteration and
//! invocation loop, independent of logging (spec.md §10.1).

/// Receives callbacks as the run controller moves through iterations and
/// invocations. Default methods do nothing, so a tracker can observe only
/// the events it cares about.
pub trait RunTracker: Send + Sync {
    /// Called before the first invocation of `iteration`.
    fn iteration_start(&self, iteration: u32) {
        let _ = iteration;
    }

    /// Called after the last invocation of `iteration`, including when the
    /// iteration ended early because an invocation found a failure.
    fn iteration_end(&self, iteration: u32) {
        let _ = iteration;
    }

    /// Called immediately before `invocation` runs.
    fn invocation_start(&self, iteration: u32, invocation: u32) {
        let _ = (iteration, invocation);
    }

    /// Called immediately after `invocation` has been run and verified.
    fn invocation_end(&self, iteration: u32, invocation: u32) {
        let _ = (iteration, invocation);
    }
}

/// A tracker that observes nothing; the default when the caller has no use
/// for these callbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracker;

impl RunTracker for NoopTracker {}

/// Chains trackers, invoking each in declared order for every callback.
#[derive(Default)]
pub struct CompositeTracker {
    trackers: Vec<Box<dyn RunTracker>>,
}

impl CompositeTracker {
    /// Builds a composite from `trackers`, run in the given order.
    #[must_use]
    pub fn new(trackers: Vec<Box<dyn RunTracker>>) -> Self {
        Self { trackers }
    }
}

impl RunTracker for CompositeTracker {
    fn iteration_start(&self, iteration: u32) {
        for tracker in &self.trackers {
            tracker.iteration_start(iteration);
        }
    }

    fn iteration_end(&self, iteration: u32) {
        for tracker in &self.trackers {
            tracker.iteration_end(iteration);
        }
    }

    fn invocation_start(&self, iteration: u32, invocation: u32) {
        for tracker in &self.trackers {
            tracker.invocation_start(iteration, invocation);
        }
    }

    fn invocation_end(&self, iteration: u32, invocation: u32) {
        for tracker in &self.trackers {
            tracker.invocation_end(iteration, invocation);
        }
    }
}
