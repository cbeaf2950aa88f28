//! Configuration for autoqa.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (AUTOQA_PLANNER_URL, AUTOQA_EXECUTOR_URL,
//!    AUTOQA_API_KEY, AUTOQA_FALLBACK_OUTCOME)
//! 2. Config file (.autoqa/config.yaml)
//! 3. Defaults (demo-mode backends, 800ms step pause, fail-safe fallback)
//!
//! Config file discovery:
//! - Searches current directory and parents for .autoqa/config.yaml

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::StepOutcome;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const ENV_PLANNER_URL: &str = "AUTOQA_PLANNER_URL";
pub const ENV_EXECUTOR_URL: &str = "AUTOQA_EXECUTOR_URL";
pub const ENV_API_KEY: &str = "AUTOQA_API_KEY";
pub const ENV_FALLBACK_OUTCOME: &str = "AUTOQA_FALLBACK_OUTCOME";

const DEFAULT_STEP_PAUSE_MS: u64 = 800;
const DEFAULT_MAX_STEPS: usize = 50;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlannerConfig {
    pub endpoint: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_steps: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutorConfig {
    pub endpoint: Option<String>,
    pub timeout_seconds: Option<u64>,
    /// "passed" or "failed"
    pub fallback_outcome: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunConfig {
    pub step_pause_ms: Option<u64>,
}

/// Resolved plan generator settings
#[derive(Debug, Clone)]
pub struct PlannerSettings {
    /// Unset means demo mode
    pub endpoint: Option<String>,
    /// Deadline per planning call; unset means wait indefinitely
    pub timeout: Option<Duration>,
    pub max_steps: usize,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// Resolved step executor settings
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Unset means demo mode
    pub endpoint: Option<String>,
    /// Deadline per step call; unset means wait indefinitely
    pub timeout: Option<Duration>,
    /// Outcome recorded when the executor itself fails
    pub fallback_outcome: StepOutcome,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: None,
            fallback_outcome: StepOutcome::Failed,
        }
    }
}

/// Orchestrator pacing
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Pause between consecutive steps
    pub step_pause: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            step_pause: Duration::from_millis(DEFAULT_STEP_PAUSE_MS),
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub planner: PlannerSettings,
    pub executor: ExecutorSettings,
    pub run: RunSettings,
    /// Bearer token for HTTP backends
    pub api_key: Option<String>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Whether either collaborator runs in demo mode
    pub fn is_demo_mode(&self) -> bool {
        self.planner.endpoint.is_none() || self.executor.endpoint.is_none()
    }
}

/// Parse an outcome name ("passed" / "failed", any case)
pub fn parse_outcome(value: &str) -> Result<StepOutcome> {
    match value.trim().to_ascii_lowercase().as_str() {
        "passed" | "pass" => Ok(StepOutcome::Passed),
        "failed" | "fail" => Ok(StepOutcome::Failed),
        other => anyhow::bail!("Invalid fallback outcome '{}': expected 'passed' or 'failed'", other),
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".autoqa").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Merge an optional config file with environment overrides
fn resolve<F>(file: Option<(PathBuf, ConfigFile)>, env: F) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let (config_file, raw) = match file {
        Some((path, raw)) => (Some(path), Some(raw)),
        None => (None, None),
    };
    let planner_raw = raw.as_ref().map(|r| r.planner.clone()).unwrap_or_default();
    let executor_raw = raw.as_ref().map(|r| r.executor.clone()).unwrap_or_default();
    let run_raw = raw.as_ref().map(|r| r.run.clone()).unwrap_or_default();

    let planner = PlannerSettings {
        endpoint: non_empty(env(ENV_PLANNER_URL)).or(non_empty(planner_raw.endpoint)),
        timeout: planner_raw.timeout_seconds.map(Duration::from_secs),
        max_steps: planner_raw.max_steps.unwrap_or(DEFAULT_MAX_STEPS),
    };

    let fallback_outcome = match non_empty(env(ENV_FALLBACK_OUTCOME)).or(executor_raw.fallback_outcome) {
        Some(value) => parse_outcome(&value)?,
        None => StepOutcome::Failed,
    };

    let executor = ExecutorSettings {
        endpoint: non_empty(env(ENV_EXECUTOR_URL)).or(non_empty(executor_raw.endpoint)),
        timeout: executor_raw.timeout_seconds.map(Duration::from_secs),
        fallback_outcome,
    };

    let run = RunSettings {
        step_pause: Duration::from_millis(run_raw.step_pause_ms.unwrap_or(DEFAULT_STEP_PAUSE_MS)),
    };

    Ok(ResolvedConfig {
        planner,
        executor,
        run,
        api_key: non_empty(env(ENV_API_KEY)),
        config_file,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let file = match find_config_file() {
        Some(path) => {
            let raw = load_config_file(&path)?;
            Some((path, raw))
        }
        None => None,
    };

    resolve(file, |key| std::env::var(key).ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (bypasses the cache)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = resolve(None, env_from(&[])).unwrap();

        assert!(config.planner.endpoint.is_none());
        assert!(config.executor.endpoint.is_none());
        assert!(config.is_demo_mode());
        assert_eq!(config.executor.fallback_outcome, StepOutcome::Failed);
        assert_eq!(config.run.step_pause, Duration::from_millis(800));
        assert_eq!(config.planner.max_steps, 50);
        assert!(config.planner.timeout.is_none());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let autoqa_dir = temp.path().join(".autoqa");
        std::fs::create_dir_all(&autoqa_dir).unwrap();

        let config_path = autoqa_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
planner:
  endpoint: http://planner.internal:8080
  timeout_seconds: 90
  max_steps: 8
executor:
  endpoint: http://runner.internal:8081
  timeout_seconds: 20
  fallback_outcome: passed
run:
  step_pause_ms: 0
"#
        )
        .unwrap();

        let raw = load_config_file(&config_path).unwrap();
        assert_eq!(raw.version, "1.0");

        let config = resolve(Some((config_path.clone(), raw)), env_from(&[])).unwrap();
        assert_eq!(config.planner.endpoint.as_deref(), Some("http://planner.internal:8080"));
        assert_eq!(config.planner.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.planner.max_steps, 8);
        assert_eq!(config.executor.timeout, Some(Duration::from_secs(20)));
        assert_eq!(config.executor.fallback_outcome, StepOutcome::Passed);
        assert_eq!(config.run.step_pause, Duration::ZERO);
        assert_eq!(config.config_file, Some(config_path));
        assert!(!config.is_demo_mode());
    }

    #[test]
    fn test_env_overrides_file() {
        let raw: ConfigFile = serde_yaml::from_str(
            r#"
version: "1.0"
planner:
  endpoint: http://from-file
executor:
  fallback_outcome: passed
"#,
        )
        .unwrap();

        let env = env_from(&[
            (ENV_PLANNER_URL, "http://from-env"),
            (ENV_FALLBACK_OUTCOME, "FAILED"),
            (ENV_API_KEY, "secret"),
        ]);
        let config = resolve(Some((PathBuf::from("x"), raw)), env).unwrap();

        assert_eq!(config.planner.endpoint.as_deref(), Some("http://from-env"));
        assert_eq!(config.executor.fallback_outcome, StepOutcome::Failed);
        assert_eq!(config.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let env = env_from(&[(ENV_EXECUTOR_URL, "  "), (ENV_API_KEY, "")]);
        let config = resolve(None, env).unwrap();

        assert!(config.executor.endpoint.is_none());
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_invalid_fallback_outcome_rejected() {
        let env = env_from(&[(ENV_FALLBACK_OUTCOME, "maybe")]);
        assert!(resolve(None, env).is_err());
    }

    #[test]
    fn test_parse_outcome_variants() {
        assert_eq!(parse_outcome("Passed").unwrap(), StepOutcome::Passed);
        assert_eq!(parse_outcome(" fail ").unwrap(), StepOutcome::Failed);
    }
}
