// src/config/mod.rs

//! Configuration loading and validation for locimport.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate invariants the runner relies on (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, EditorSection, PipelineSection, RawConfigFile, RunnerSection, SelectionSection,
    SourceControlSection, TaskConfig,
};
pub use validate::validate_config;
