//! Session state for one test-agent run.
//!
//! A Session is the aggregate the orchestrator owns and mutates;
//! everything else only ever sees cloned snapshots of it.

use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::log::LogStream;
use super::suite::TestSuite;

/// Top-level lifecycle phase of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[default]
    Idle,
    Planning,
    Running,
    Complete,
    Error,
}

impl Phase {
    /// A run is in flight
    pub fn is_active(self) -> bool {
        matches!(self, Self::Planning | Self::Running)
    }

    /// The run has ended, successfully or not
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "IDLE",
            Self::Planning => "PLANNING",
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// Rejected target configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("Target URL is empty")]
    EmptyUrl,

    #[error("Target URL is not a valid URL: {url} ({reason})")]
    InvalidUrl { url: String, reason: String },
}

/// What to test and, optionally, who to test as
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl TargetConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    /// Attach credentials. Blank values are treated as absent.
    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username.filter(|u| !u.trim().is_empty());
        self.password = password.filter(|p| !p.is_empty());
        self
    }

    /// Validate, returning the config with surrounding whitespace stripped
    /// from the URL
    pub fn normalized(mut self) -> Result<Self, TargetError> {
        self.validate()?;
        self.url = self.url.trim().to_string();
        Ok(self)
    }

    /// Check the URL is present and parseable
    pub fn validate(&self) -> Result<Url, TargetError> {
        let raw = self.url.trim();
        if raw.is_empty() {
            return Err(TargetError::EmptyUrl);
        }

        Url::parse(raw).map_err(|e| TargetError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })
    }
}

/// The mutable aggregate for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Identifier of the current run; changes on every `start`
    pub run_id: Option<Uuid>,

    pub phase: Phase,

    /// Fixed for the duration of a run, cleared on reset
    pub target: Option<TargetConfig>,

    /// Present once planning succeeds
    pub suite: Option<TestSuite>,

    /// Step currently executing
    pub active_step_id: Option<String>,

    pub log_stream: LogStream,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh IDLE session
    pub fn new() -> Self {
        Self {
            run_id: None,
            phase: Phase::Idle,
            target: None,
            suite: None,
            active_step_id: None,
            log_stream: LogStream::new(),
        }
    }

    /// Return to IDLE, dropping the suite, target and logs
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Begin a new run: clear the previous run and enter PLANNING
    pub(crate) fn begin(&mut self, run_id: Uuid, target: TargetConfig) {
        self.run_id = Some(run_id);
        self.phase = Phase::Planning;
        self.target = Some(target);
        self.suite = None;
        self.active_step_id = None;
        self.log_stream.clear();
    }

    /// Whether the given run is still the session's current run
    pub fn is_current(&self, run_id: Uuid) -> bool {
        self.run_id == Some(run_id)
    }
}
