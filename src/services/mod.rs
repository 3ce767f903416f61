// Business logic: batch clearing, two-tier settlement, round lifecycle

pub mod clearing;
pub mod coordinator;
pub mod settlement;

pub use coordinator::{RoundCoordinator, RoundState, SubmissionOutcome};
