//! Domain types for the autoqa orchestrator.
//!
//! This module contains the core data structures:
//! - Session: the per-run aggregate (phase, target, suite, log stream)
//! - Suite: test suites, steps and step results
//! - Log: the session log stream
//! - Artifact: the generated script export

pub mod artifact;
pub mod log;
pub mod session;
pub mod suite;

// Re-export commonly used types
pub use artifact::ScriptArtifact;
pub use log::{LogEntry, LogLevel, LogStream};
pub use session::{Phase, Session, TargetConfig, TargetError};
pub use suite::{
    PlannedStep, PlannedSuite, StepOutcome, StepResult, StepStatus, TestStep, TestSuite,
};
