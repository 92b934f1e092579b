// Wayfarer
// Main entry point for the wayfarer binary

use clap::Parser;
use std::process::ExitCode;
use wayfarer_engine::cli::{Cli, Command, ConfigAction};
use wayfarer_engine::config::Config;
use wayfarer_engine::handlers::{
    handle_config_path, handle_config_show, handle_doctor, handle_run, handle_tools, OutputFormat,
};
use wayfarer_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let config = if cli.config.is_some() {
        Config::load_from_path(&config_path)?
    } else {
        Config::load_or_create()?
    };

    // `--log` beats the config file; RUST_LOG beats both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Wayfarer v{} ({} - {})", version, commit, timestamp);

    let status = match cli.command {
        Command::Run {
            task,
            max_steps,
            quiet,
        } => {
            tracing::info!("Executing task: {}", task);
            return Ok(handle_run(task, max_steps, quiet, &config, format)
                .await?
                .into());
        }

        Command::Tools => handle_tools(&config, format).await,

        Command::Config { action } => match action {
            ConfigAction::Show => handle_config_show(&config, format).await,
            ConfigAction::Path => handle_config_path(&config_path, format).await,
        },

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }
    };

    status.map(|()| ExitCode::SUCCESS)
}
