//! A correctly synchronized counter passes across a full checker run
//! (spec.md §8 E1: "Counter with `incAndGet`/`get` ... the checker reports
//! success within the default iteration budget").

use actorcheck::model::actor::ActorTemplate;
use actorcheck::model::result::ResultValue;
use actorcheck::oracle::{OperationOutcome, SequentialOracle};
use actorcheck::prelude::*;

#[derive(Clone, PartialEq)]
struct Counter {
    value: i64,
}

impl Snapshot for Counter {
    type State = i64;
    fn snapshot(&self) -> i64 {
        self.value
    }
    fn restore(&mut self, state: i64) {
        self.value = state;
    }
}

impl CheckedType for Counter {
    fn new_instance() -> Self {
        Self { value: 0 }
    }

    fn operations() -> Vec<ActorTemplate> {
        vec![ActorTemplate::new("incAndGet"), ActorTemplate::new("get")]
    }

    fn oracle() -> SequentialOracle<Self> {
        SequentialOracle::new()
            .with_operation("incAndGet", |c, _args| {
                c.value += 1;
                OperationOutcome::Value(ResultValue::Int(c.value))
            })
            .with_operation("get", |c, _args| OperationOutcome::Value(ResultValue::Int(c.value)))
    }
}

#[test]
fn counter_is_reported_linearizable() {
    let checker: Checker<Counter> = Checker::new(
        CheckerConfig::builder()
            .iterations(30)
            .invocations_per_iteration(50)
            .threads(2)
            .actors_per_thread(3)
            .build(),
    );

    let report = checker.check_with_seed(2026_07_27);
    assert!(report.is_success(), "{report}");
}
