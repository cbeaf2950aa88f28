//! Core orchestration logic.
//!
//! This module contains:
//! - Orchestrator: the session state machine and step-execution loop
//! - Report: summary statistics over a finished suite

pub mod orchestrator;
pub mod report;

// Re-export commonly used types
pub use orchestrator::{Orchestrator, RunHandle, StartError, RUNNER_PREFIX};
pub use report::{Report, ReportError, StepTiming};
