// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::WorkflowId;

/// Command-line arguments for `stepwise`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stepwise",
    version,
    about = "Run multi-step workflows with dependency-gated tasks.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the engine config file (TOML).
    ///
    /// Default: `Stepwise.toml` in the current working directory. A missing
    /// file means defaults.
    #[arg(long, value_name = "PATH", default_value = "Stepwise.toml")]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STEPWISE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the polling scheduler until Ctrl-C.
    Run {
        /// Exit once nothing is runnable and nothing is running.
        #[arg(long)]
        until_idle: bool,
    },

    /// Create a workflow from a definition document.
    Submit {
        /// Workflow definition (YAML, JSON or TOML by extension).
        #[arg(long, value_name = "PATH")]
        definition: PathBuf,

        /// Owning client identifier.
        #[arg(long, value_name = "ID")]
        client_id: String,

        /// File holding the input payload shared by all tasks. Reads stdin
        /// when omitted.
        #[arg(long, value_name = "PATH")]
        input: Option<PathBuf>,
    },

    /// Print the status of a workflow.
    Status { workflow_id: WorkflowId },

    /// Print the final report of a completed workflow.
    Results { workflow_id: WorkflowId },

    /// Parse + validate a definition and print its steps, without touching
    /// the store.
    Validate {
        #[arg(long, value_name = "PATH")]
        definition: PathBuf,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
