// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocimportError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Pipe or process creation failed for a task; the task never ran.
    #[error("failed to launch task '{task}': {reason}")]
    LaunchFailure { task: String, reason: String },

    /// Backup, swap or restore of the source-control settings file failed.
    #[error("Environment error: {0}")]
    EnvironmentError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, LocimportError>;
