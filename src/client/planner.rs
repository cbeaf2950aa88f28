//! Plan generator client.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::adapters::{PlanBackend, PlanGenerationError};
use crate::config::PlannerSettings;
use crate::domain::{PlannedSuite, TestSuite};

/// Requests test plans and turns them into pending suites
pub struct PlanGeneratorClient {
    backend: Arc<dyn PlanBackend>,
    timeout: Option<Duration>,
    max_steps: usize,
}

impl PlanGeneratorClient {
    /// Client with default settings (no deadline)
    pub fn new(backend: Arc<dyn PlanBackend>) -> Self {
        Self::from_settings(backend, &PlannerSettings::default())
    }

    pub fn from_settings(backend: Arc<dyn PlanBackend>, settings: &PlannerSettings) -> Self {
        Self {
            backend,
            timeout: settings.timeout,
            max_steps: settings.max_steps,
        }
    }

    /// Bound each planning call
    pub fn with_timeout(mut self, deadline: Duration) -> Self {
        self.timeout = Some(deadline);
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Generate a plan for `url`.
    ///
    /// The URL must already have been validated by the caller. On success
    /// every step is PENDING with no logs and no duration.
    #[instrument(skip(self, username), fields(backend = %self.backend.name()))]
    pub async fn generate_plan(
        &self,
        url: &str,
        username: Option<&str>,
    ) -> Result<TestSuite, PlanGenerationError> {
        let request = self.backend.generate_plan(url, username);

        let plan = match self.timeout {
            Some(deadline) => timeout(deadline, request)
                .await
                .map_err(|_| PlanGenerationError::Timeout(deadline))?,
            None => request.await,
        }
        .map_err(|e| {
            warn!(error = %e, "Plan generation failed");
            e
        })?;

        validate_plan(&plan, self.max_steps)?;
        debug!(steps = plan.steps.len(), suite = %plan.name, "Plan accepted");

        Ok(TestSuite::from(plan))
    }
}

/// Reject plans the orchestrator cannot run
fn validate_plan(plan: &PlannedSuite, max_steps: usize) -> Result<(), PlanGenerationError> {
    if plan.steps.is_empty() {
        return Err(PlanGenerationError::EmptyPlan);
    }

    if plan.steps.len() > max_steps {
        return Err(PlanGenerationError::TooManySteps {
            actual: plan.steps.len(),
            limit: max_steps,
        });
    }

    let mut seen = HashSet::new();
    for step in &plan.steps {
        if step.id.trim().is_empty() {
            return Err(PlanGenerationError::Malformed(format!(
                "step '{}' has an empty id",
                step.name
            )));
        }
        if !seen.insert(step.id.as_str()) {
            return Err(PlanGenerationError::DuplicateStepId(step.id.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PlannedStep, StepStatus};
    use async_trait::async_trait;

    struct FixedPlan(Vec<&'static str>);

    #[async_trait]
    impl PlanBackend for FixedPlan {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate_plan(
            &self,
            _url: &str,
            _username: Option<&str>,
        ) -> Result<PlannedSuite, PlanGenerationError> {
            Ok(PlannedSuite {
                name: "Suite".to_string(),
                description: "desc".to_string(),
                summary: "sum".to_string(),
                generated_code: "code".to_string(),
                steps: self
                    .0
                    .iter()
                    .map(|id| PlannedStep {
                        id: id.to_string(),
                        name: format!("Step {}", id),
                        description: String::new(),
                    })
                    .collect(),
            })
        }
    }

    struct Stalled;

    #[async_trait]
    impl PlanBackend for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn generate_plan(
            &self,
            _url: &str,
            _username: Option<&str>,
        ) -> Result<PlannedSuite, PlanGenerationError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_plan_steps_start_pending() {
        let client = PlanGeneratorClient::new(Arc::new(FixedPlan(vec!["a", "b", "c"])));
        let suite = client.generate_plan("https://example.com", None).await.unwrap();

        assert_eq!(suite.step_ids(), vec!["a", "b", "c"]);
        assert!(suite.steps.iter().all(|s| s.status == StepStatus::Pending));
        assert_eq!(suite.generated_code, "code");
    }

    #[tokio::test]
    async fn test_empty_plan_rejected() {
        let client = PlanGeneratorClient::new(Arc::new(FixedPlan(vec![])));
        let err = client.generate_plan("https://example.com", None).await.unwrap_err();
        assert_eq!(err, PlanGenerationError::EmptyPlan);
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let client = PlanGeneratorClient::new(Arc::new(FixedPlan(vec!["a", "b", "a"])));
        let err = client.generate_plan("https://example.com", None).await.unwrap_err();
        assert_eq!(err, PlanGenerationError::DuplicateStepId("a".to_string()));
    }

    #[tokio::test]
    async fn test_step_limit_enforced() {
        let settings = PlannerSettings {
            max_steps: 2,
            ..Default::default()
        };
        let client =
            PlanGeneratorClient::from_settings(Arc::new(FixedPlan(vec!["a", "b", "c"])), &settings);

        let err = client.generate_plan("https://example.com", None).await.unwrap_err();
        assert_eq!(err, PlanGenerationError::TooManySteps { actual: 3, limit: 2 });
    }

    #[tokio::test]
    async fn test_deadline_maps_to_timeout() {
        let client =
            PlanGeneratorClient::new(Arc::new(Stalled)).with_timeout(Duration::from_millis(10));

        let err = client.generate_plan("https://example.com", None).await.unwrap_err();
        assert_eq!(err, PlanGenerationError::Timeout(Duration::from_millis(10)));
    }
}
