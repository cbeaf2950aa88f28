//! Test suites and their steps.
//!
//! A suite is produced once by planning. Its step order is the
//! execution order and never changes afterwards; only the per-step
//! status, logs and duration are filled in as the run progresses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a single test step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    /// Not yet started
    #[default]
    Pending,

    /// Currently executing
    Running,

    /// Finished and passed
    Passed,

    /// Finished and failed
    Failed,

    /// Interrupted before a result was recorded
    Skipped,
}

impl StepStatus {
    /// Terminal statuses never change again within a run
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Skipped)
    }

    /// Statuses only move forward: PENDING -> RUNNING -> terminal.
    pub fn can_transition_to(self, next: StepStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Running) => true,
            (Self::Pending, Self::Skipped) => true,
            (Self::Running, next) => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        };
        f.write_str(label)
    }
}

/// Outcome reported by a step executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepOutcome {
    Passed,
    Failed,
}

impl From<StepOutcome> for StepStatus {
    fn from(outcome: StepOutcome) -> Self {
        match outcome {
            StepOutcome::Passed => StepStatus::Passed,
            StepOutcome::Failed => StepStatus::Failed,
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        StepStatus::from(*self).fmt(f)
    }
}

/// Result of executing one step: runner log lines plus an outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub logs: Vec<String>,
    pub outcome: StepOutcome,
}

impl StepResult {
    pub fn new(logs: Vec<String>, outcome: StepOutcome) -> Self {
        Self { logs, outcome }
    }
}

/// One scenario within a suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    /// Unique within its suite
    pub id: String,

    pub name: String,

    pub description: String,

    #[serde(default)]
    pub status: StepStatus,

    /// Runner output, empty until the step finishes
    #[serde(default)]
    pub logs: Vec<String>,

    /// Elapsed execution time, unset until the step finishes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl TestStep {
    /// Create a pending step with no logs or duration
    pub fn pending(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            status: StepStatus::Pending,
            logs: Vec::new(),
            duration_ms: None,
        }
    }

    /// Apply a status change if it moves forward. Returns false otherwise.
    pub fn advance(&mut self, next: StepStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Merge an executor result into this step
    pub fn record(&mut self, result: StepResult, duration_ms: u64) {
        self.advance(result.outcome.into());
        self.logs = result.logs;
        self.duration_ms = Some(duration_ms);
    }
}

/// Step as described by the plan generator, before lifecycle fields exist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl From<PlannedStep> for TestStep {
    fn from(step: PlannedStep) -> Self {
        TestStep::pending(step.id, step.name, step.description)
    }
}

/// Suite as returned by the plan generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedSuite {
    pub name: String,
    pub description: String,
    pub summary: String,
    pub generated_code: String,
    pub steps: Vec<PlannedStep>,
}

/// Generated set of ordered test steps plus descriptive metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    pub name: String,
    pub description: String,
    pub summary: String,

    /// Opaque script artifact, passed through unmodified
    pub generated_code: String,

    pub steps: Vec<TestStep>,
}

impl From<PlannedSuite> for TestSuite {
    fn from(plan: PlannedSuite) -> Self {
        Self {
            name: plan.name,
            description: plan.description,
            summary: plan.summary,
            generated_code: plan.generated_code,
            steps: plan.steps.into_iter().map(TestStep::from).collect(),
        }
    }
}

impl TestSuite {
    pub fn step_mut(&mut self, id: &str) -> Option<&mut TestStep> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// Steps currently marked RUNNING
    pub fn running_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Running)
            .count()
    }

    /// Step ids in execution order
    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_moves_forward_only() {
        assert!(StepStatus::Pending.can_transition_to(StepStatus::Running));
        assert!(StepStatus::Running.can_transition_to(StepStatus::Passed));
        assert!(StepStatus::Running.can_transition_to(StepStatus::Skipped));
        assert!(!StepStatus::Passed.can_transition_to(StepStatus::Running));
        assert!(!StepStatus::Failed.can_transition_to(StepStatus::Pending));
        assert!(!StepStatus::Running.can_transition_to(StepStatus::Pending));
    }

    #[test]
    fn test_record_fills_result_fields() {
        let mut step = TestStep::pending("1", "Load Homepage", "Open the site");
        assert!(step.advance(StepStatus::Running));

        step.record(
            StepResult::new(vec!["navigated".to_string()], StepOutcome::Failed),
            420,
        );

        assert_eq!(step.status, StepStatus::Failed);
        assert_eq!(step.logs, vec!["navigated".to_string()]);
        assert_eq!(step.duration_ms, Some(420));
    }

    #[test]
    fn test_planned_suite_deserializes_camel_case() {
        let json = r#"{
            "name": "Shop",
            "description": "Checkout flows",
            "summary": "Happy paths first",
            "generatedCode": "test('x', () => {});",
            "steps": [
                {"id": "a", "name": "Home", "description": "Open home"},
                {"id": "b", "name": "Cart", "description": "Add to cart"}
            ]
        }"#;

        let plan: PlannedSuite = serde_json::from_str(json).unwrap();
        let suite = TestSuite::from(plan);

        assert_eq!(suite.generated_code, "test('x', () => {});");
        assert_eq!(suite.step_ids(), vec!["a", "b"]);
        assert!(suite
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Pending && s.logs.is_empty() && s.duration_ms.is_none()));
    }
}
