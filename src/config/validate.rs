// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile, MIN_DRAIN_GRACE_MS};
use crate::errors::{LocimportError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::LocimportError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Run every check on an already-deserialized config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_raw_config(cfg)
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_editor(cfg)?;
    validate_runner(cfg)?;
    validate_tasks(cfg)?;
    validate_settings_swap(cfg)?;
    validate_selection(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pipeline.is_none() && cfg.task.is_empty() {
        return Err(LocimportError::ConfigError(
            "config must contain a [pipeline] section or at least one [[task]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_editor(cfg: &RawConfigFile) -> Result<()> {
    if cfg.editor.executable.as_os_str().is_empty() {
        return Err(LocimportError::ConfigError(
            "[editor].executable must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_runner(cfg: &RawConfigFile) -> Result<()> {
    if cfg.runner.poll_interval_ms == 0 {
        return Err(LocimportError::ConfigError(
            "[runner].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.runner.drain_grace_ms < MIN_DRAIN_GRACE_MS {
        return Err(LocimportError::ConfigError(format!(
            "[runner].drain_grace_ms must be >= {MIN_DRAIN_GRACE_MS} (got {})",
            cfg.runner.drain_grace_ms
        )));
    }
    if cfg.runner.script_marker.trim().is_empty() {
        return Err(LocimportError::ConfigError(
            "[runner].script_marker must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for task in &cfg.task {
        if task.name.trim().is_empty() {
            return Err(LocimportError::ConfigError(
                "every [[task]] needs a non-empty `name`".to_string(),
            ));
        }
        if task.script_path.trim().is_empty() {
            return Err(LocimportError::ConfigError(format!(
                "task '{}' has an empty `script_path`",
                task.name
            )));
        }
        if !seen.insert(task.name.as_str()) {
            return Err(LocimportError::ConfigError(format!(
                "task '{}' is defined more than once",
                task.name
            )));
        }
    }
    Ok(())
}

fn validate_settings_swap(cfg: &RawConfigFile) -> Result<()> {
    if !cfg.needs_settings_swap() {
        return Ok(());
    }

    let sc = &cfg.source_control;
    let missing: Vec<&str> = [
        ("global_settings", sc.global_settings.is_none()),
        ("project_settings", sc.project_settings.is_none()),
        ("backup_dir", sc.backup_dir.is_none()),
    ]
    .into_iter()
    .filter_map(|(key, missing)| missing.then_some(key))
    .collect();

    if !missing.is_empty() {
        return Err(LocimportError::ConfigError(format!(
            "tasks with use_project_file = false need [source_control] {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// The pipeline's update step reads the selection file, so a pipeline run
/// needs a spreadsheet to point it at.
fn validate_selection(cfg: &RawConfigFile) -> Result<()> {
    let runs_pipeline = cfg.task.is_empty() && cfg.pipeline.is_some();
    if runs_pipeline && cfg.selection.spreadsheet.is_none() {
        return Err(LocimportError::ConfigError(
            "[pipeline] runs need [selection].spreadsheet".to_string(),
        ));
    }
    Ok(())
}
