//! Clients for the two external collaborators.
//!
//! - PlanGeneratorClient: requests a plan, validates it, maps failures
//!   to [`PlanGenerationError`]
//! - StepExecutorClient: requests one step's outcome; never fails and
//!   substitutes a fallback result when the backend does

pub mod executor;
pub mod planner;

pub use crate::adapters::PlanGenerationError;
pub use executor::StepExecutorClient;
pub use planner::PlanGeneratorClient;
