//! JSON-over-HTTP backends.
//!
//! Endpoints:
//! - `POST {planner}/plan` with `{url, username}` returns a planned suite
//! - `POST {executor}/execute` with `{step, url}` returns `{logs, status}`
//!
//! Auth: optional bearer token.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::domain::{PlannedSuite, StepOutcome, StepResult, TestStep};

use super::{PlanBackend, PlanGenerationError, StepBackend};

/// Request body for plan generation
#[derive(Debug, Serialize)]
struct PlanRequest<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
}

/// Step as sent to the executor (lifecycle fields are ours, not theirs)
#[derive(Debug, Serialize)]
struct StepPayload<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    step: StepPayload<'a>,
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    #[serde(default)]
    logs: Vec<String>,
    #[serde(default)]
    status: String,
}

impl From<ExecuteResponse> for StepResult {
    fn from(response: ExecuteResponse) -> Self {
        // Anything other than an explicit failure counts as a pass
        let outcome = if response.status.eq_ignore_ascii_case("FAILED") {
            StepOutcome::Failed
        } else {
            StepOutcome::Passed
        };
        StepResult::new(response.logs, outcome)
    }
}

fn join_url(endpoint: &str, path: &str) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), path)
}

fn authorize(request: reqwest::RequestBuilder, api_key: Option<&str>) -> reqwest::RequestBuilder {
    match api_key {
        Some(key) => request.bearer_auth(key),
        None => request,
    }
}

/// Plan generator reached over HTTP
pub struct HttpPlanBackend {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpPlanBackend {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            endpoint,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PlanBackend for HttpPlanBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn generate_plan(
        &self,
        url: &str,
        username: Option<&str>,
    ) -> Result<PlannedSuite, PlanGenerationError> {
        let request = self
            .client
            .post(join_url(&self.endpoint, "plan"))
            .json(&PlanRequest { url, username });

        let response = authorize(request, self.api_key.as_deref())
            .send()
            .await
            .map_err(|e| PlanGenerationError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PlanGenerationError::InvalidCredentials);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PlanGenerationError::Unavailable(format!(
                "planner returned {}: {}",
                status,
                text.trim()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PlanGenerationError::Unavailable(e.to_string()))?;
        if body.trim().is_empty() {
            return Err(PlanGenerationError::Malformed("empty response".to_string()));
        }

        serde_json::from_str(&body).map_err(|e| PlanGenerationError::Malformed(e.to_string()))
    }
}

/// Step executor reached over HTTP
pub struct HttpStepBackend {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpStepBackend {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            endpoint,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl StepBackend for HttpStepBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn execute_step(&self, step: &TestStep, url: &str) -> Result<StepResult> {
        let body = ExecuteRequest {
            step: StepPayload {
                id: &step.id,
                name: &step.name,
                description: &step.description,
            },
            url,
        };

        let request = self
            .client
            .post(join_url(&self.endpoint, "execute"))
            .json(&body);

        let response = authorize(request, self.api_key.as_deref())
            .send()
            .await
            .with_context(|| format!("Failed to reach step executor for step '{}'", step.name))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Step executor error ({}): {}", status, text.trim());
        }

        let parsed: ExecuteResponse = response
            .json()
            .await
            .context("Failed to parse step executor response")?;

        Ok(parsed.into())
    }
}
