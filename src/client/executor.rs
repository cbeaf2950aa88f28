//! Step executor client.
//!
//! Always resolves to a [`StepResult`]. A failing or stalled backend
//! degrades to the fallback result instead of halting the run.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{instrument, warn};

use crate::adapters::StepBackend;
use crate::config::ExecutorSettings;
use crate::domain::{StepOutcome, StepResult, TestStep};

/// Log lines recorded when the backend could not produce a result
pub const FALLBACK_LOGS: [&str; 3] = [
    "Error connecting to simulation engine",
    "Retry attempt 1...",
    "Execution timeout",
];

pub struct StepExecutorClient {
    backend: Arc<dyn StepBackend>,
    timeout: Option<Duration>,
    fallback_outcome: StepOutcome,
}

impl StepExecutorClient {
    /// Client with default settings (no deadline, fail-safe fallback)
    pub fn new(backend: Arc<dyn StepBackend>) -> Self {
        Self::from_settings(backend, &ExecutorSettings::default())
    }

    pub fn from_settings(backend: Arc<dyn StepBackend>, settings: &ExecutorSettings) -> Self {
        Self {
            backend,
            timeout: settings.timeout,
            fallback_outcome: settings.fallback_outcome,
        }
    }

    pub fn with_fallback_outcome(mut self, outcome: StepOutcome) -> Self {
        self.fallback_outcome = outcome;
        self
    }

    pub fn with_timeout(mut self, deadline: Duration) -> Self {
        self.timeout = Some(deadline);
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Result substituted for a failed backend call
    pub fn fallback(&self) -> StepResult {
        StepResult::new(
            FALLBACK_LOGS.iter().map(|l| l.to_string()).collect(),
            self.fallback_outcome,
        )
    }

    /// Execute one step against `url`. Never fails.
    #[instrument(skip(self, step, url), fields(step = %step.name, backend = %self.backend.name()))]
    pub async fn execute_step(&self, step: &TestStep, url: &str) -> StepResult {
        let request = self.backend.execute_step(step, url);

        let outcome = match self.timeout {
            Some(deadline) => match timeout(deadline, request).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("step timed out after {:?}", deadline)),
            },
            None => request.await,
        };

        match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    error = %e,
                    fallback = %self.fallback_outcome,
                    "Step executor failed, using fallback result"
                );
                self.fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct Broken;

    #[async_trait]
    impl StepBackend for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn execute_step(&self, _step: &TestStep, _url: &str) -> Result<StepResult> {
            anyhow::bail!("upstream 503")
        }
    }

    struct Stalled;

    #[async_trait]
    impl StepBackend for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn execute_step(&self, _step: &TestStep, _url: &str) -> Result<StepResult> {
            std::future::pending().await
        }
    }

    struct Echo;

    #[async_trait]
    impl StepBackend for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn execute_step(&self, step: &TestStep, url: &str) -> Result<StepResult> {
            Ok(StepResult::new(
                vec![format!("{} @ {}", step.name, url)],
                StepOutcome::Failed,
            ))
        }
    }

    fn step() -> TestStep {
        TestStep::pending("1", "Load Homepage", "Open the site")
    }

    #[tokio::test]
    async fn test_backend_result_passed_through() {
        let client = StepExecutorClient::new(Arc::new(Echo));
        let result = client.execute_step(&step(), "https://example.com").await;

        assert_eq!(result.outcome, StepOutcome::Failed);
        assert_eq!(result.logs, vec!["Load Homepage @ https://example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_failure_uses_fail_safe_fallback_by_default() {
        let client = StepExecutorClient::new(Arc::new(Broken));
        let result = client.execute_step(&step(), "https://example.com").await;

        assert_eq!(result.outcome, StepOutcome::Failed);
        assert_eq!(result.logs.len(), FALLBACK_LOGS.len());
    }

    #[tokio::test]
    async fn test_fallback_outcome_configurable() {
        let client =
            StepExecutorClient::new(Arc::new(Broken)).with_fallback_outcome(StepOutcome::Passed);
        let result = client.execute_step(&step(), "https://example.com").await;

        assert_eq!(result.outcome, StepOutcome::Passed);
    }

    #[tokio::test]
    async fn test_stalled_backend_times_out_to_fallback() {
        let client =
            StepExecutorClient::new(Arc::new(Stalled)).with_timeout(Duration::from_millis(10));
        let result = client.execute_step(&step(), "https://example.com").await;

        assert_eq!(result, client.fallback());
    }

    #[tokio::test]
    async fn test_input_step_untouched() {
        let client = StepExecutorClient::new(Arc::new(Echo));
        let original = step();
        let _ = client.execute_step(&original, "https://example.com").await;

        assert_eq!(original, step());
    }
}
