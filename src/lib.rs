//! autoqa - Autonomous test-agent orchestrator
//!
//! Given a target URL (and optional credentials), autoqa asks a plan
//! generator for a test suite, executes the suite's steps one at a time
//! through a step executor, and aggregates the results into a report.
//!
//! # Architecture
//!
//! The system is built around a single owned session:
//! - The orchestrator is the only mutator of session state
//! - Observers read cloned snapshots through a watch channel
//! - Every run carries its own cancellation token, so a superseded run
//!   can never write into the session of a newer one
//!
//! # Modules
//!
//! - `adapters`: Collaborator backends (HTTP, demo mode)
//! - `client`: Plan generator and step executor clients
//! - `core`: Orchestration logic (Orchestrator, Report)
//! - `domain`: Data structures (Session, TestSuite, LogStream)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Plan and run a suite against a site
//! autoqa run https://example.com
//!
//! # Only generate the plan and save its script
//! autoqa plan https://example.com --output playwright.test.ts
//! ```

pub mod adapters;
pub mod cli;
pub mod client;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use client::{PlanGenerationError, PlanGeneratorClient, StepExecutorClient};
pub use crate::core::{Orchestrator, Report, ReportError, RunHandle, StartError};
pub use domain::{
    LogEntry, LogLevel, LogStream, Phase, Session, StepOutcome, StepResult, StepStatus,
    TargetConfig, TestStep, TestSuite,
};
