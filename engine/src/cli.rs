//! CLI interface for Wayfarer
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Wayfarer: a bounded-step reasoning agent
///
/// Asks a language model for one tool action at a time, runs it, and feeds
/// the result back until the model finishes or the step budget runs out.
#[derive(Parser, Debug)]
#[command(name = "wayfarer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a task
    Run {
        /// The task to execute
        task: String,

        /// Override the configured step budget
        #[arg(long, value_name = "N")]
        max_steps: Option<usize>,

        /// Do not echo model tokens while they stream in
        #[arg(short, long)]
        quiet: bool,
    },

    /// List the registered tools
    Tools,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check configuration and provider availability
    Doctor,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_flags() {
        let cli = Cli::try_parse_from([
            "wayfarer",
            "--json",
            "run",
            "find trains to Shanghai",
            "--max-steps",
            "5",
            "-q",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Command::Run {
                task,
                max_steps,
                quiet,
            } => {
                assert_eq!(task, "find trains to Shanghai");
                assert_eq!(max_steps, Some(5));
                assert!(quiet);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "wayfarer",
            "config",
            "show",
            "--config",
            "/tmp/wayfarer.toml",
            "--log",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/wayfarer.toml")));
        assert_eq!(cli.log.as_deref(), Some("debug"));
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));
    }

    #[test]
    fn test_run_requires_task() {
        assert!(Cli::try_parse_from(["wayfarer", "run"]).is_err());
    }
}
