//! Scenario and result data model (spec.md §3).

pub mod actor;
pub mod execution;
pub mod result;
pub mod scenario;

pub use actor::{Actor, ActorTemplate, GroupId, OperationId};
pub use execution::{Clock, ExecutionResult, ResultWithClock};
pub use result::{ActorResult, ResultValue};
pub use scenario::Scenario;
