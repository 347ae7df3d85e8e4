// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `locimport`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "locimport",
    version,
    about = "Import translations by running the localization commandlet pipeline.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Locimport.toml` in the current working directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LOCIMPORT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task list and resolved command lines,
    /// but don't launch anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Write every task's captured output to this file once the queue stops.
    #[arg(long, value_name = "PATH")]
    pub save_log: Option<String>,

    /// Override `[runner].poll_interval_ms` from the config file.
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,
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
