//! Linearizability verifier (spec.md §4.3) — "the single most intricate
//! subsystem".

pub mod cache;
pub mod lts;

pub use lts::{LinearizabilityVerifier, LinearizationStep, VerificationOutcome};
