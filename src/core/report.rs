//! Report aggregation over a finished suite.
//!
//! Pure and deterministic: safe to recompute on every query.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{StepStatus, TestSuite};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("Cannot build a report for a suite with no steps")]
    EmptySuite,
}

/// Per-step row for duration charts and tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTiming {
    pub id: String,
    pub name: String,
    pub status: StepStatus,
    /// Zero when the step never finished
    pub duration_ms: u64,
}

/// Summary statistics for a suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub suite_name: String,
    pub total_steps: usize,
    pub passed_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    /// Whole percent, rounded half up
    pub success_rate: u32,
    pub total_duration_ms: u64,
    pub avg_duration_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Integer division rounding half up (inputs are non-negative)
fn div_round(numerator: u64, denominator: u64) -> u64 {
    (2 * numerator + denominator) / (2 * denominator)
}

impl Report {
    /// Aggregate a suite's step results
    pub fn aggregate(suite: &TestSuite) -> Result<Self, ReportError> {
        if suite.steps.is_empty() {
            return Err(ReportError::EmptySuite);
        }

        let total = suite.steps.len();
        let count = |status: StepStatus| suite.steps.iter().filter(|s| s.status == status).count();
        let passed_count = count(StepStatus::Passed);
        let failed_count = count(StepStatus::Failed);
        let skipped_count = count(StepStatus::Skipped);

        let steps: Vec<StepTiming> = suite
            .steps
            .iter()
            .map(|s| StepTiming {
                id: s.id.clone(),
                name: s.name.clone(),
                status: s.status,
                duration_ms: s.duration_ms.unwrap_or(0),
            })
            .collect();
        let total_duration_ms: u64 = steps.iter().map(|s| s.duration_ms).sum();

        Ok(Self {
            suite_name: suite.name.clone(),
            total_steps: total,
            passed_count,
            failed_count,
            skipped_count,
            success_rate: div_round(100 * passed_count as u64, total as u64) as u32,
            total_duration_ms,
            avg_duration_ms: div_round(total_duration_ms, total as u64),
            steps,
        })
    }

    /// Suite verdict: passed when no step failed
    pub fn is_passing(&self) -> bool {
        self.failed_count == 0
    }

    pub fn verdict(&self) -> &'static str {
        if self.is_passing() {
            "Suite Passed"
        } else {
            "Suite Failed"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TestStep;

    fn suite_with(results: &[(StepStatus, Option<u64>)]) -> TestSuite {
        TestSuite {
            name: "Suite".to_string(),
            description: String::new(),
            summary: String::new(),
            generated_code: String::new(),
            steps: results
                .iter()
                .enumerate()
                .map(|(i, (status, duration))| {
                    let mut step = TestStep::pending(i.to_string(), format!("Step {}", i), "");
                    step.status = *status;
                    step.duration_ms = *duration;
                    step
                })
                .collect(),
        }
    }

    #[test]
    fn test_aggregate_mixed_results() {
        let suite = suite_with(&[
            (StepStatus::Passed, Some(100)),
            (StepStatus::Passed, Some(200)),
            (StepStatus::Failed, Some(300)),
        ]);

        let report = Report::aggregate(&suite).unwrap();

        assert_eq!(report.passed_count, 2);
        assert_eq!(report.failed_count, 1);
        assert_eq!(report.success_rate, 67);
        assert_eq!(report.total_duration_ms, 600);
        assert_eq!(report.avg_duration_ms, 200);
        assert!(!report.is_passing());
        assert_eq!(report.verdict(), "Suite Failed");
    }

    #[test]
    fn test_empty_suite_rejected() {
        let suite = suite_with(&[]);
        assert_eq!(Report::aggregate(&suite), Err(ReportError::EmptySuite));
    }

    #[test]
    fn test_missing_durations_count_as_zero() {
        let suite = suite_with(&[
            (StepStatus::Passed, Some(250)),
            (StepStatus::Skipped, None),
        ]);

        let report = Report::aggregate(&suite).unwrap();

        assert_eq!(report.total_duration_ms, 250);
        assert_eq!(report.avg_duration_ms, 125);
        assert_eq!(report.skipped_count, 1);
        assert_eq!(report.success_rate, 50);
        assert!(report.is_passing());
    }

    #[test]
    fn test_rounding_half_up() {
        // 1/8 = 12.5% -> 13
        let mut results = vec![(StepStatus::Failed, Some(1)); 7];
        results.push((StepStatus::Passed, Some(2)));
        let report = Report::aggregate(&suite_with(&results)).unwrap();

        assert_eq!(report.success_rate, 13);
        // 9 / 8 = 1.125 -> 1
        assert_eq!(report.avg_duration_ms, 1);
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let suite = suite_with(&[(StepStatus::Passed, Some(10)), (StepStatus::Failed, Some(20))]);
        assert_eq!(Report::aggregate(&suite), Report::aggregate(&suite));
    }
}
