//! Run orchestrator.
//!
//! Drives a session through IDLE -> PLANNING -> RUNNING -> COMPLETE,
//! with ERROR reachable from PLANNING and RUNNING. Each run gets its own
//! cancellation token; every suspension point (planning call, step call,
//! inter-step pause) races that token, and every session mutation made by
//! a run is rejected once the run has been cancelled or superseded.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::adapters;
use crate::client::{PlanGenerationError, PlanGeneratorClient, StepExecutorClient};
use crate::config::{ResolvedConfig, RunSettings};
use crate::domain::{
    LogLevel, Phase, Session, StepOutcome, StepStatus, TargetConfig, TargetError, TestSuite,
};

use super::report::Report;

/// Prefix marking log lines that came from the step runner
pub const RUNNER_PREFIX: &str = "[RUNNER]";

/// `start` was rejected before anything changed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("Invalid target: {0}")]
    InvalidTarget(#[from] TargetError),
}

/// Append to a session's log stream, mirroring the entry into tracing
fn push_log(session: &mut Session, message: impl Into<String>, level: LogLevel) {
    let message = message.into();
    debug!(%level, "{}", message);
    session.log_stream.append(message, level);
}

/// The run currently owned by the orchestrator
struct ActiveRun {
    run_id: Uuid,
    token: CancellationToken,
}

/// Handle to a spawned run
#[derive(Debug)]
pub struct RunHandle {
    run_id: Uuid,
    task: JoinHandle<()>,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Wait for the run task to stop, whether it settled or was cancelled
    pub async fn finished(self) -> Result<(), JoinError> {
        let result = self.task.await;
        if let Err(ref e) = result {
            error!(run_id = %self.run_id, error = %e, "Run task did not finish cleanly");
        }
        result
    }
}

/// Everything one run needs, passed explicitly into its task
struct RunContext {
    run_id: Uuid,
    token: CancellationToken,
    target: TargetConfig,
    state: Arc<watch::Sender<Session>>,
    planner: Arc<PlanGeneratorClient>,
    executor: Arc<StepExecutorClient>,
    settings: RunSettings,
}

impl RunContext {
    /// Mutate the session on behalf of this run.
    ///
    /// Returns false, without touching the session, once the run has been
    /// cancelled or the session belongs to a newer run.
    fn update<F>(&self, mutate: F) -> bool
    where
        F: FnOnce(&mut Session),
    {
        self.state.send_if_modified(|session| {
            if self.token.is_cancelled() || !session.is_current(self.run_id) {
                return false;
            }
            mutate(session);
            true
        })
    }

    async fn drive(self) {
        let username = self.target.username.clone();

        let planned = tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                debug!("Run cancelled during planning");
                return;
            }
            result = self.planner.generate_plan(&self.target.url, username.as_deref()) => result,
        };

        match planned {
            Ok(suite) => {
                if self.enter_running(suite.clone()) {
                    self.run(suite).await;
                }
            }
            Err(e) => self.fail_planning(e),
        }
    }

    fn fail_planning(&self, err: PlanGenerationError) {
        error!(error = %err, "Failed to generate test plan");
        self.update(|session| {
            push_log(session, format!("Failed to generate test plan: {}", err), LogLevel::Error);
            session.phase = Phase::Error;
        });
    }

    fn enter_running(&self, suite: TestSuite) -> bool {
        info!(suite = %suite.name, steps = suite.steps.len(), "Test plan generated");
        self.update(|session| {
            push_log(session, format!("Test Plan Generated: {}", suite.name), LogLevel::Success);
            push_log(session, format!("Description: {}", suite.description), LogLevel::Info);
            push_log(
                session,
                format!("Identified {} critical test scenarios.", suite.steps.len()),
                LogLevel::Info,
            );
            session.suite = Some(suite);
            session.phase = Phase::Running;
        })
    }

    /// Execute the suite's steps in order, one at a time
    async fn run(&self, plan: TestSuite) {
        let total = plan.steps.len();

        for (idx, mut step) in plan.steps.into_iter().enumerate() {
            let started = self.update(|session| {
                session.active_step_id = Some(step.id.clone());
                if let Some(current) = session.suite.as_mut().and_then(|s| s.step_mut(&step.id)) {
                    current.advance(StepStatus::Running);
                }
                push_log(
                    session,
                    format!("Executing Step [{}/{}]: {}...", idx + 1, total, step.name),
                    LogLevel::Info,
                );
            });
            if !started {
                return;
            }
            step.advance(StepStatus::Running);

            let step_start = Instant::now();
            let result = tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    debug!(step = %step.name, "Run cancelled during step execution");
                    return;
                }
                result = self.executor.execute_step(&step, &self.target.url) => result,
            };
            let duration_ms = u64::try_from(step_start.elapsed().as_millis()).unwrap_or(u64::MAX);

            info!(step = %step.name, outcome = %result.outcome, duration_ms, "Step finished");

            let outcome = result.outcome;
            let recorded = self.update(|session| {
                for line in &result.logs {
                    push_log(session, format!("{} {}", RUNNER_PREFIX, line), LogLevel::Info);
                }
                if let Some(current) = session.suite.as_mut().and_then(|s| s.step_mut(&step.id)) {
                    current.record(result, duration_ms);
                }
                let level = match outcome {
                    StepOutcome::Passed => LogLevel::Success,
                    StepOutcome::Failed => LogLevel::Error,
                };
                push_log(session, format!("Step {} finished: {}", step.name, outcome), level);
            });
            if !recorded {
                return;
            }

            if idx + 1 < total {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => {
                        debug!("Run cancelled between steps");
                        return;
                    }
                    _ = tokio::time::sleep(self.settings.step_pause) => {}
                }
            }
        }

        let completed = self.update(|session| {
            session.active_step_id = None;
            push_log(session, "Test Suite Execution Completed.", LogLevel::Success);
            session.phase = Phase::Complete;
        });
        if completed {
            info!("Test suite execution completed");
        }
    }
}

/// Owns one session and the run currently acting on it
pub struct Orchestrator {
    planner: Arc<PlanGeneratorClient>,
    executor: Arc<StepExecutorClient>,
    settings: RunSettings,
    state: Arc<watch::Sender<Session>>,
    active: Mutex<Option<ActiveRun>>,
}

impl Orchestrator {
    pub fn new(
        planner: PlanGeneratorClient,
        executor: StepExecutorClient,
        settings: RunSettings,
    ) -> Self {
        let (state, _) = watch::channel(Session::new());
        Self {
            planner: Arc::new(planner),
            executor: Arc::new(executor),
            settings,
            state: Arc::new(state),
            active: Mutex::new(None),
        }
    }

    /// Build clients and backends from resolved configuration
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let (plan_backend, step_backend) = adapters::from_config(config);
        Self::new(
            PlanGeneratorClient::from_settings(plan_backend, &config.planner),
            StepExecutorClient::from_settings(step_backend, &config.executor),
            config.run.clone(),
        )
    }

    /// Start a new run for `target`.
    ///
    /// Any run still in flight is cancelled first and can no longer touch
    /// the session. Must be called from within a Tokio runtime.
    pub fn start(&self, target: TargetConfig) -> Result<RunHandle, StartError> {
        let target = target.normalized()?;

        let run_id = Uuid::new_v4();
        let token = CancellationToken::new();
        let url = target.url.clone();
        info!(
            %run_id,
            %url,
            planner = self.planner.backend_name(),
            executor = self.executor.backend_name(),
            "Starting test agent run"
        );

        // Held until the session belongs to the new run, so a concurrent
        // start or reset cannot pair this token with another run's session.
        let mut active = self.lock_active();
        let superseded = active.replace(ActiveRun {
            run_id,
            token: token.clone(),
        });
        if let Some(previous) = superseded {
            previous.token.cancel();
            debug!(previous = %previous.run_id, "Superseding earlier run");
        }

        let session_target = target.clone();
        self.state.send_modify(|session| {
            session.begin(run_id, session_target);
            push_log(session, format!("Target acquired: {}", url), LogLevel::Info);
            push_log(session, "Initializing AI Test Architect Agent...", LogLevel::Info);
            push_log(session, "Analyzing target application structure...", LogLevel::Info);
        });

        let ctx = RunContext {
            run_id,
            token,
            target,
            state: Arc::clone(&self.state),
            planner: Arc::clone(&self.planner),
            executor: Arc::clone(&self.executor),
            settings: self.settings.clone(),
        };
        let task = tokio::spawn(ctx.drive().instrument(info_span!("run", %run_id, %url)));
        drop(active);

        Ok(RunHandle { run_id, task })
    }

    /// Return to IDLE from any phase, cancelling any in-flight run
    pub fn reset(&self) {
        let mut active = self.lock_active();
        cancel_active(&mut active);
        self.state.send_modify(Session::reset);
    }

    /// Reset, then note the sign-out in the fresh log stream
    pub fn sign_out(&self) {
        let mut active = self.lock_active();
        cancel_active(&mut active);
        self.state.send_modify(|session| {
            session.reset();
            push_log(session, "User signed out. Session terminated.", LogLevel::Info);
        });
        info!("User signed out");
    }

    /// Interrupt the in-flight run, if any.
    ///
    /// The step that was executing is marked SKIPPED and the session moves
    /// to ERROR. Returns false when there was nothing to interrupt.
    pub fn abort(&self) -> bool {
        let mut active = self.lock_active();
        let Some(run) = cancel_active(&mut active) else {
            return false;
        };

        let aborted = self.state.send_if_modified(|session| {
            if !session.is_current(run.run_id) || !session.phase.is_active() {
                return false;
            }

            let interrupted = session.active_step_id.take().and_then(|id| {
                let step = session.suite.as_mut()?.step_mut(&id)?;
                step.advance(StepStatus::Skipped).then(|| step.name.clone())
            });
            let message = match interrupted {
                Some(name) => format!("Run aborted. Step {} marked {}.", name, StepStatus::Skipped),
                None => "Run aborted.".to_string(),
            };
            push_log(session, message, LogLevel::Warn);
            session.phase = Phase::Error;
            true
        });

        if aborted {
            warn!(run_id = %run.run_id, "Run aborted");
        }
        aborted
    }

    /// Clone of the current session
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    /// Receiver notified after every session change
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Aggregated report, available once the session is COMPLETE
    pub fn report(&self) -> Option<Report> {
        let session = self.state.borrow();
        if session.phase != Phase::Complete {
            return None;
        }
        session
            .suite
            .as_ref()
            .and_then(|suite| Report::aggregate(suite).ok())
    }

    /// Lock the active-run slot. Session writes that change which run owns
    /// the session happen while this guard is held.
    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Take the in-flight run out of its slot and cancel it
fn cancel_active(active: &mut Option<ActiveRun>) -> Option<ActiveRun> {
    let run = active.take()?;
    run.token.cancel();
    debug!(run_id = %run.run_id, "Cancelled in-flight run");
    Some(run)
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        cancel_active(self.active.get_mut().unwrap_or_else(PoisonError::into_inner));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockPlanBackend, MockStepBackend};
    use std::time::Duration;

    fn demo_orchestrator() -> Orchestrator {
        Orchestrator::new(
            PlanGeneratorClient::new(Arc::new(MockPlanBackend::with_latency(Duration::ZERO))),
            StepExecutorClient::new(Arc::new(MockStepBackend::with_latency(Duration::ZERO))),
            RunSettings {
                step_pause: Duration::ZERO,
            },
        )
    }

    #[test]
    fn test_new_orchestrator_is_idle() {
        let orchestrator = demo_orchestrator();
        let session = orchestrator.snapshot();

        assert_eq!(session.phase, Phase::Idle);
        assert!(session.suite.is_none());
        assert_eq!(session.log_stream.len(), 1);
        assert!(orchestrator.report().is_none());
    }

    #[tokio::test]
    async fn test_start_enters_planning_synchronously() {
        let orchestrator = demo_orchestrator();
        let handle = orchestrator.start(TargetConfig::new("https://example.com")).unwrap();

        let session = orchestrator.snapshot();
        assert_eq!(session.phase, Phase::Planning);
        assert_eq!(session.log_stream.entries()[0].message, "Target acquired: https://example.com");
        assert!(session.is_current(handle.run_id()));

        handle.finished().await.unwrap();
        assert_eq!(orchestrator.phase(), Phase::Complete);
    }

    #[tokio::test]
    async fn test_abort_without_run_is_noop() {
        let orchestrator = demo_orchestrator();
        assert!(!orchestrator.abort());
        assert_eq!(orchestrator.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_abort_after_completion_keeps_complete() {
        let orchestrator = demo_orchestrator();
        let handle = orchestrator.start(TargetConfig::new("https://example.com")).unwrap();
        handle.finished().await.unwrap();

        assert!(!orchestrator.abort());
        assert_eq!(orchestrator.phase(), Phase::Complete);
        assert!(orchestrator.report().is_some());
    }
}
