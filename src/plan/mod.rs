// src/plan/mod.rs

//! Building the task list for a run.
//!
//! Either the fixed translation-import pipeline (from `[pipeline]`) or an
//! explicit `[[task]]` list, which takes precedence when present.

use std::path::Path;

use crate::config::model::{ConfigFile, PipelineSection};
use crate::queue::Task;

pub mod bridge;

pub use bridge::{PythonScriptBridge, ScriptBridge, TranslationSelection};

pub const GATHER_TASK: &str = "Gather Text";
pub const EXPORT_TASK: &str = "Export Translations";
pub const UPDATE_TASK: &str = "(Python) Update Translations";
pub const IMPORT_TASK: &str = "Import Translations";
pub const REPORT_TASK: &str = "Generate Reports";
pub const COMPILE_TASK: &str = "Compile Translations";

/// Gather → export → scripted update → import → report → compile.
///
/// The update step always runs with the project file; the others follow
/// `pipeline.use_project_file`.
pub fn build_pipeline(pipeline: &PipelineSection, bridge: &dyn ScriptBridge) -> Vec<Task> {
    let config = |step: &str| config_path(&pipeline.config_dir, &pipeline.target, step);
    let with_project = pipeline.use_project_file;

    vec![
        Task::new(GATHER_TASK, config("Gather"), with_project),
        Task::new(EXPORT_TASK, config("Export"), with_project),
        Task::new(UPDATE_TASK, bridge.update_script(), true),
        Task::new(IMPORT_TASK, config("Import"), with_project),
        Task::new(REPORT_TASK, config("GenerateReports"), with_project),
        Task::new(COMPILE_TASK, config("Compile"), with_project),
    ]
}

/// Tasks for this config: the explicit list if any, otherwise the pipeline.
pub fn tasks_from_config(cfg: &ConfigFile, bridge: &dyn ScriptBridge) -> Vec<Task> {
    if !cfg.task.is_empty() {
        return cfg.task.iter().map(Task::from).collect();
    }
    match &cfg.pipeline {
        Some(pipeline) => build_pipeline(pipeline, bridge),
        None => Vec::new(),
    }
}

/// True when the run uses the fixed pipeline (and so needs the selection
/// file for its update step).
pub fn uses_pipeline(cfg: &ConfigFile) -> bool {
    cfg.task.is_empty() && cfg.pipeline.is_some()
}

/// `<config_dir>/<target>_<step>.ini`
fn config_path(config_dir: &Path, target: &str, step: &str) -> String {
    config_dir
        .join(format!("{target}_{step}.ini"))
        .to_string_lossy()
        .into_owned()
}
