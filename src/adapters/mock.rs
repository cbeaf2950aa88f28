//! Demo-mode backends.
//!
//! Used when no planner or executor endpoint is configured. They return
//! a fixed five-step web smoke suite and always-passing step runs after
//! a simulated network delay.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Local;
use reqwest::Url;

use crate::domain::{PlannedStep, PlannedSuite, StepOutcome, StepResult, TestStep};

use super::{PlanBackend, PlanGenerationError, StepBackend};

const PLAN_LATENCY: Duration = Duration::from_millis(1500);
const STEP_LATENCY: Duration = Duration::from_millis(1000);

const MOCK_STEPS: [(&str, &str, &str); 5] = [
    ("1", "Load Homepage", "Navigate to the site and verify connectivity"),
    ("2", "Check Navigation", "Verify that top-level menu items are clickable"),
    ("3", "Verify Metadata", "Check page title and meta descriptions for SEO"),
    ("4", "Responsiveness Test", "Check layout on mobile and tablet viewport sizes"),
    ("5", "Footer Check", "Ensure contact info and social links are present"),
];

fn playwright_script(url: &str) -> String {
    format!(
        r#"import {{ test, expect }} from '@playwright/test';

test('basic website check', async ({{ page }}) => {{
  await page.goto('{url}');
  await expect(page).toHaveTitle(/./);

  // Navigation check
  const links = await page.locator('nav a').count();
  console.log('Found ' + links + ' navigation links');
}});
"#
    )
}

/// Plan generator returning a canned smoke-test suite
pub struct MockPlanBackend {
    latency: Duration,
}

impl Default for MockPlanBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlanBackend {
    pub fn new() -> Self {
        Self {
            latency: PLAN_LATENCY,
        }
    }

    /// Override the simulated latency
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl PlanBackend for MockPlanBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_plan(
        &self,
        url: &str,
        _username: Option<&str>,
    ) -> Result<PlannedSuite, PlanGenerationError> {
        tokio::time::sleep(self.latency).await;

        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| PlanGenerationError::Malformed(format!("no host in '{}'", url)))?;

        Ok(PlannedSuite {
            name: format!("Automated Test Suite for {}", host),
            description: format!("Autonomous quality assessment for {} (Mock Mode)", url),
            summary: "Pre-generated testing strategy focused on critical web vitals and basic \
                      functionality, used because live plan generation is disabled."
                .to_string(),
            generated_code: playwright_script(url),
            steps: MOCK_STEPS
                .iter()
                .map(|(id, name, description)| PlannedStep {
                    id: id.to_string(),
                    name: name.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        })
    }
}

/// Step executor that simulates a passing runner
pub struct MockStepBackend {
    latency: Duration,
}

impl Default for MockStepBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStepBackend {
    pub fn new() -> Self {
        Self {
            latency: STEP_LATENCY,
        }
    }

    /// Override the simulated latency
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl StepBackend for MockStepBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute_step(&self, step: &TestStep, _url: &str) -> Result<StepResult> {
        tokio::time::sleep(self.latency).await;

        let now = Local::now().format("%H:%M:%S");
        let logs = vec![
            format!("[{}] Executing Playwright task: {}", now, step.name),
            format!("[{}] Navigating to path: /", now),
            format!("[{}] Selector '.main-content' found and visible", now),
            format!("[{}] Assertion passed: {}", now, step.description),
            format!("[{}] Step finished with zero errors.", now),
        ];

        Ok(StepResult::new(logs, StepOutcome::Passed))
    }
}
