//! Command-line interface for autoqa.
//!
//! Commands for running the test agent against a target and for
//! generating a plan without executing it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters;
use crate::client::PlanGeneratorClient;
use crate::config::{self, ResolvedConfig};
use crate::core::{Orchestrator, Report};
use crate::domain::{LogEntry, Phase, ScriptArtifact, Session, TargetConfig, TestSuite};

/// autoqa - Autonomous test agent orchestrator
#[derive(Parser, Debug)]
#[command(name = "autoqa")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan and execute a test suite against a target URL
    Run {
        /// Target URL
        url: String,

        /// Username for login scenarios
        #[arg(short, long)]
        username: Option<String>,

        /// Password for login scenarios
        #[arg(short, long, env = "AUTOQA_TARGET_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Write the generated test script to this path
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a test plan without executing it
    Plan {
        /// Target URL
        url: String,

        /// Username for login scenarios
        #[arg(short, long)]
        username: Option<String>,

        /// Write the generated test script to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run {
                url,
                username,
                password,
                export,
                json,
            } => {
                let target = TargetConfig::new(url).with_credentials(username, password);
                run_agent(target, export, json).await
            }
            Commands::Plan {
                url,
                username,
                output,
            } => {
                let target = TargetConfig::new(url).with_credentials(username, None);
                generate_plan(target, output).await
            }
            Commands::Config => show_config(),
        }
    }
}

/// Print log entries not yet shown; returns the new high-water mark
fn print_new_logs(session: &Session, printed: usize) -> usize {
    let entries: &[LogEntry] = session.log_stream.entries();
    for entry in entries.iter().skip(printed) {
        eprintln!("{}", entry);
    }
    entries.len().max(printed)
}

/// Run the full agent workflow, streaming the log to stderr
async fn run_agent(target: TargetConfig, export: Option<PathBuf>, json: bool) -> Result<()> {
    let config = config::config()?;
    if config.is_demo_mode() {
        eprintln!("[demo mode: no planner/executor endpoint configured, using simulated collaborators]");
    }

    let orchestrator = Orchestrator::from_config(config);
    let mut updates = orchestrator.subscribe();
    let handle = orchestrator.start(target)?;

    let mut printed = 0;
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let session = updates.borrow_and_update().clone();
                printed = print_new_logs(&session, printed);
                if session.phase.is_settled() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                orchestrator.abort();
                break;
            }
        }
    }

    handle.finished().await.context("Run task failed")?;
    let session = orchestrator.snapshot();
    print_new_logs(&session, printed);

    if let (Some(path), Some(suite)) = (export, session.suite.as_ref()) {
        export_script(suite, &path).await?;
    }

    match session.phase {
        Phase::Complete => {
            let report = orchestrator
                .report()
                .context("Completed run produced no report")?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialize report")?
                );
            } else if let Some(suite) = session.suite.as_ref() {
                print_report(suite, &report);
            }
            if !report.is_passing() {
                std::process::exit(1);
            }
        }
        Phase::Error => {
            eprintln!("\n[Run failed: see log above]");
            std::process::exit(1);
        }
        other => {
            eprintln!("\n[Run stopped in phase {}]", other);
        }
    }

    Ok(())
}

/// Generate and print a plan only
async fn generate_plan(target: TargetConfig, output: Option<PathBuf>) -> Result<()> {
    let target = target.normalized()?;

    let config = config::config()?;
    let (backend, _) = adapters::from_config(config);
    let client = PlanGeneratorClient::from_settings(backend, &config.planner);

    let suite = client
        .generate_plan(&target.url, target.username.as_deref())
        .await
        .context("Failed to generate test plan")?;

    println!("{}", suite.name);
    println!("{}", suite.description);
    println!();
    for (idx, step) in suite.steps.iter().enumerate() {
        println!("  {:02}  {:<28} {}", idx + 1, step.name, step.description);
    }
    println!();
    println!("{}", suite.summary);

    if let Some(path) = output {
        export_script(&suite, &path).await?;
    }

    Ok(())
}

async fn export_script(suite: &TestSuite, path: &Path) -> Result<()> {
    let artifact = ScriptArtifact::from_suite(suite);
    let written = artifact.write_to(path).await?;
    eprintln!(
        "[Script written to {} ({} bytes, sha256 {})]",
        written.display(),
        artifact.size_bytes,
        artifact.sha256
    );
    Ok(())
}

fn print_report(suite: &TestSuite, report: &Report) {
    println!();
    println!("{}  [{}]", suite.name, report.verdict());
    println!("{}", suite.summary);
    println!();
    println!(
        "Success rate: {}% ({}/{} passing)",
        report.success_rate, report.passed_count, report.total_steps
    );
    println!(
        "Duration: {}ms total, {}ms average",
        report.total_duration_ms, report.avg_duration_ms
    );
    println!();
    println!("{:<4} {:<28} {:<8} {:>8}", "#", "STEP", "STATUS", "TIME");
    println!("{}", "-".repeat(52));
    for (idx, step) in report.steps.iter().enumerate() {
        println!(
            "{:02}   {:<28} {:<8} {:>6}ms",
            idx + 1,
            step.name,
            step.status.to_string(),
            step.duration_ms
        );
    }
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let config: ResolvedConfig = config::reload_config()?;

    println!("autoqa configuration");
    println!("{}", "=".repeat(40));
    println!();
    println!(
        "Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none, using defaults)".to_string())
    );
    println!();
    println!(
        "Planner:  {}",
        config.planner.endpoint.as_deref().unwrap_or("(demo mode)")
    );
    println!("  timeout:   {:?}", config.planner.timeout);
    println!("  max steps: {}", config.planner.max_steps);
    println!(
        "Executor: {}",
        config.executor.endpoint.as_deref().unwrap_or("(demo mode)")
    );
    println!("  timeout:   {:?}", config.executor.timeout);
    println!("  fallback:  {}", config.executor.fallback_outcome);
    println!();
    println!("Step pause: {:?}", config.run.step_pause);
    println!(
        "API key:    {}",
        if config.api_key.is_some() { "set" } else { "not set" }
    );

    Ok(())
}
