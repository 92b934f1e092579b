//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: Execute a task
//! - tools: List registered tools
//! - config show / config path: Inspect configuration
//! - doctor: Validate configuration and check the provider

use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use sdk::errors::AgentErrorExt;

use crate::agent::{AgentCore, NoopSink, StdoutSink, TaskOutcome, TokenSink};
use crate::config::Config;
use crate::llm;
use crate::tools::ToolRegistry;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// How a `run` invocation ended once its outcome has been printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    /// The task failed and the error has already been reported
    Failed,
}

impl From<RunStatus> for ExitCode {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Succeeded => ExitCode::SUCCESS,
            RunStatus::Failed => ExitCode::FAILURE,
        }
    }
}

/// Run a task
///
/// Tokens stream to stdout unless `quiet` is set, JSON output is requested,
/// or `agent.stream_tokens` is off. A task failure is printed here and comes
/// back as [`RunStatus::Failed`]; `Err` is reserved for setup problems.
pub async fn handle_run(
    task: String,
    max_steps: Option<usize>,
    quiet: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<RunStatus> {
    let mut config = config.clone();
    if let Some(max_steps) = max_steps {
        if max_steps == 0 {
            anyhow::bail!("--max-steps must be at least 1");
        }
        config.agent.max_steps = max_steps;
    }

    let stream = config.agent.stream_tokens && !quiet && format == OutputFormat::Text;
    let sink: Arc<dyn TokenSink> = if stream {
        Arc::new(StdoutSink)
    } else {
        Arc::new(NoopSink)
    };

    let mut agent = AgentCore::from_config(&config)
        .context("Failed to initialize agent")?
        .with_sink(sink);

    if format == OutputFormat::Text {
        println!("Executing task: {}", task);
        println!();
    }

    let result = agent.execute(&task).await;

    match result {
        Ok(report) => {
            match format {
                OutputFormat::Text => {
                    println!();
                    println!("Result:");
                    println!("{}", report.reply);
                    println!();
                    match report.outcome {
                        TaskOutcome::Completed => println!("✓ Task completed"),
                        TaskOutcome::StepBudgetExhausted => {
                            println!("✗ Step budget exhausted")
                        }
                    }
                    println!("  Task ID:  {}", report.task_id);
                    println!("  Steps:    {}", report.steps);
                    println!("  Duration: {}ms", report.duration_ms);
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
            Ok(RunStatus::Succeeded)
        }
        Err(e) => {
            match format {
                OutputFormat::Text => {
                    println!();
                    println!("✗ Task failed: {}", e);
                    println!("  Hint: {}", e.user_hint());
                }
                OutputFormat::Json => {
                    let output = json!({
                        "status": "failed",
                        "error": e.to_string(),
                        "hint": e.user_hint()
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
            tracing::debug!("Task failed: {}", e);
            Ok(RunStatus::Failed)
        }
    }
}

/// List the tools the configuration registers
pub async fn handle_tools(config: &Config, format: OutputFormat) -> Result<()> {
    let registry = ToolRegistry::from_config(&config.tools).context("Failed to build tools")?;

    match format {
        OutputFormat::Text => {
            println!("Registered tools ({}):", registry.len());
            println!();
            for name in registry.names() {
                if let Some(tool) = registry.get(name) {
                    println!("  {}", name);
                    println!("    {}", tool.description());
                }
            }
        }
        OutputFormat::Json => {
            let tools: Vec<_> = registry
                .names()
                .into_iter()
                .filter_map(|name| registry.get(name))
                .map(|tool| {
                    json!({
                        "name": tool.name(),
                        "description": tool.description(),
                        "parameters": tool.parameters()
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "tools": tools }))?);
        }
    }

    Ok(())
}

/// Print the effective configuration
pub async fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", config.to_toml()?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}

/// Print the configuration file path
pub async fn handle_config_path(path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", path.display()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "path": path.display().to_string() }))?
        ),
    }
    Ok(())
}

/// Run diagnostics
///
/// Reports configuration checks and whether the configured provider is
/// reachable.
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(&str, String)> = Vec::new();

    // Config is already validated when loaded
    checks.push(("Configuration", "Valid".to_string()));

    let model = match config.llm.provider.as_str() {
        "openai" => &config.llm.openai.model,
        _ => &config.llm.ollama.model,
    };
    checks.push(("Provider", format!("{} ({})", config.llm.provider, model)));

    match llm::create_provider(&config.llm) {
        Ok(provider) => {
            if provider.check_health().await {
                checks.push(("Provider health", "Available".to_string()));
            } else {
                checks.push(("Provider health", "Not available".to_string()));
                issues.push(if provider.is_local() {
                    format!(
                        "Ollama is not reachable at {}. Start Ollama to use the local model.",
                        config.llm.ollama.base_url
                    )
                } else {
                    format!(
                        "{} did not answer at {}. Check the endpoint and API key.",
                        provider.name(),
                        config.llm.openai.base_url
                    )
                });
            }
        }
        Err(e) => {
            checks.push(("Provider health", "Not configured".to_string()));
            issues.push(e.to_string());
        }
    }

    match ToolRegistry::from_config(&config.tools) {
        Ok(registry) => checks.push(("Tools", registry.names().join(", "))),
        Err(e) => {
            checks.push(("Tools", "Invalid".to_string()));
            issues.push(e.to_string());
        }
    }

    checks.push(("Step budget", config.agent.max_steps.to_string()));
    checks.push((
        "Memory ceiling",
        format!("{} tokens", config.agent.memory_token_limit),
    ));

    for (label, path) in [
        ("Task prompt", &config.agent.task_prompt),
        ("Final prompt", &config.agent.final_prompt),
    ] {
        match path {
            Some(path) if path.exists() => checks.push((label, path.display().to_string())),
            Some(path) => {
                checks.push((label, "Missing".to_string()));
                issues.push(format!("Prompt template not found: {}", path.display()));
            }
            None => checks.push((label, "Built-in".to_string())),
        }
    }

    match format {
        OutputFormat::Text => {
            println!("Wayfarer Diagnostics");
            println!("====================");
            println!();

            for (check, status) in &checks {
                println!("  {:<18} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
