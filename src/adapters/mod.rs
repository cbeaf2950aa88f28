//! Backend interfaces for the external collaborators.
//!
//! Backends talk to whatever actually produces plans and step outcomes.
//! The clients in [`crate::client`] wrap them with validation, deadlines
//! and fallback handling.

pub mod http;
pub mod mock;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::config::ResolvedConfig;
use crate::domain::{PlannedSuite, StepResult, TestStep};

pub use http::{HttpPlanBackend, HttpStepBackend};
pub use mock::{MockPlanBackend, MockStepBackend};

/// Planning failed; no partial suite is ever returned alongside this
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanGenerationError {
    #[error("Plan generator unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed plan response: {0}")]
    Malformed(String),

    #[error("Plan generator rejected the supplied credentials")]
    InvalidCredentials,

    #[error("Plan contains no steps")]
    EmptyPlan,

    #[error("Plan contains duplicate step id '{0}'")]
    DuplicateStepId(String),

    #[error("Plan has {actual} steps, limit is {limit}")]
    TooManySteps { actual: usize, limit: usize },

    #[error("Plan generation timed out after {0:?}")]
    Timeout(Duration),
}

/// Produces a test plan for a target
#[async_trait]
pub trait PlanBackend: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    async fn generate_plan(
        &self,
        url: &str,
        username: Option<&str>,
    ) -> Result<PlannedSuite, PlanGenerationError>;
}

/// Produces the outcome of a single step
#[async_trait]
pub trait StepBackend: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    async fn execute_step(&self, step: &TestStep, url: &str) -> Result<StepResult>;
}

/// Pick backends from configuration. Unset endpoints fall back to demo mode.
pub fn from_config(config: &ResolvedConfig) -> (Arc<dyn PlanBackend>, Arc<dyn StepBackend>) {
    let planner: Arc<dyn PlanBackend> = match &config.planner.endpoint {
        Some(endpoint) => Arc::new(HttpPlanBackend::new(endpoint.clone(), config.api_key.clone())),
        None => Arc::new(MockPlanBackend::new()),
    };

    let executor: Arc<dyn StepBackend> = match &config.executor.endpoint {
        Some(endpoint) => Arc::new(HttpStepBackend::new(endpoint.clone(), config.api_key.clone())),
        None => Arc::new(MockStepBackend::new()),
    };

    (planner, executor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_mode_without_endpoints() {
        let config = ResolvedConfig::default();
        let (planner, executor) = from_config(&config);

        assert_eq!(planner.name(), "mock");
        assert_eq!(executor.name(), "mock");
    }

    #[test]
    fn test_http_backends_when_configured() {
        let mut config = ResolvedConfig::default();
        config.planner.endpoint = Some("http://planner.local".to_string());
        config.executor.endpoint = Some("http://runner.local".to_string());

        let (planner, executor) = from_config(&config);

        assert_eq!(planner.name(), "http");
        assert_eq!(executor.name(), "http");
    }
}
