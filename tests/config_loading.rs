mod common;
use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder};
use crate::common::TestResult;

use std::io::Write;

use locimport::config::model::MIN_DRAIN_GRACE_MS;
use locimport::config::{load_and_validate, load_from_path, validate_config, ConfigFile};
use locimport::errors::LocimportError;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> Result<NamedTempFile, std::io::Error> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    Ok(file)
}

#[test]
fn pipeline_config_loads_with_defaults() -> TestResult {
    let file = write_config(
        r#"
[editor]
executable = "/opt/ue/UE4Editor-Cmd"
project = "/work/Game/Game.uproject"

[pipeline]
target = "Game"
config_dir = "/work/Game/Config/Localization"
script_dir = "/work/Game/Plugins/LocalizationImporter/Content/Python"

[selection]
spreadsheet = "/work/translations.xlsx"
pages = ["Menus", "Dialogue"]
languages = ["French"]
"#,
    )?;

    let cfg = load_and_validate(file.path())?;

    assert_eq!(cfg.runner.poll_interval_ms, 100);
    assert_eq!(cfg.runner.drain_grace_ms, 2_000);
    assert_eq!(cfg.runner.script_marker, "update_translations");
    assert!(!cfg.source_control.enabled);
    assert!(cfg.task.is_empty());
    let pipeline = cfg.pipeline.as_ref().ok_or("pipeline missing")?;
    assert_eq!(pipeline.target, "Game");
    assert!(pipeline.use_project_file);
    assert_eq!(cfg.selection.pages, vec!["Menus", "Dialogue"]);
    assert!(!cfg.needs_settings_swap());
    Ok(())
}

#[test]
fn explicit_task_list_is_kept_in_order() -> TestResult {
    let file = write_config(
        r#"
[editor]
executable = "editor"

[source_control]
enabled = true
global_settings = "/engine/Saved/Config/SourceControlSettings.ini"
project_settings = "/work/Game/Saved/Config/SourceControlSettings.ini"
backup_dir = "/work/Game/Saved/Backup"

[[task]]
name = "Gather"
script_path = "Config/Localization/Game_Gather.ini"

[[task]]
name = "Compile"
script_path = "Config/Localization/Game_Compile.ini"
use_project_file = false
"#,
    )?;

    let cfg = load_and_validate(file.path())?;
    let names: Vec<_> = cfg.task.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Gather", "Compile"]);
    assert!(cfg.task[0].use_project_file);
    assert!(!cfg.task[1].use_project_file);
    assert!(cfg.needs_settings_swap());
    Ok(())
}

#[test]
fn relative_paths_are_anchored_at_the_config_directory() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Locimport.toml");
    std::fs::write(
        &path,
        r#"
[editor]
executable = "UE4Editor-Cmd"
project = "Game/Game.uproject"

[pipeline]
target = "Game"
config_dir = "Game/Config/Localization"
script_dir = "/abs/Python"

[selection]
spreadsheet = "D:/Sheets/Game.xlsx"
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.editor.executable, std::path::PathBuf::from("UE4Editor-Cmd"));
    assert_eq!(cfg.editor.project, Some(dir.path().join("Game/Game.uproject")));
    let pipeline = cfg.pipeline.as_ref().ok_or("pipeline missing")?;
    assert_eq!(pipeline.config_dir, dir.path().join("Game/Config/Localization"));
    assert_eq!(pipeline.script_dir, std::path::PathBuf::from("/abs/Python"));
    assert_eq!(
        cfg.selection.spreadsheet,
        Some(std::path::PathBuf::from("D:/Sheets/Game.xlsx"))
    );
    Ok(())
}

#[test]
fn config_without_tasks_is_rejected() -> TestResult {
    let file = write_config("[editor]\nexecutable = \"editor\"\n")?;
    let err = load_and_validate(file.path()).err().ok_or("expected an error")?;
    assert!(matches!(err, LocimportError::ConfigError(_)));
    assert!(err.to_string().contains("[pipeline]"));
    Ok(())
}

#[test]
fn malformed_toml_is_a_toml_error() -> TestResult {
    let file = write_config("[editor\nexecutable = ")?;
    let err = load_from_path(file.path()).err().ok_or("expected an error")?;
    assert!(matches!(err, LocimportError::TomlError(_)));
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_and_validate("/definitely/not/here/Locimport.toml").unwrap_err();
    assert!(matches!(err, LocimportError::IoError(_)));
}

#[test]
fn duplicate_task_names_are_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_task(TaskConfigBuilder::new("Gather", "a.ini").build())
        .with_task(TaskConfigBuilder::new("Gather", "b.ini").build())
        .raw();
    let err = validate_config(&raw).unwrap_err();
    assert!(err.to_string().contains("more than once"), "{err}");
}

#[test]
fn empty_script_path_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_task(TaskConfigBuilder::new("Gather", "  ").build())
        .raw();
    assert!(ConfigFile::try_from(raw).is_err());
}

#[test]
fn zero_poll_interval_is_rejected() {
    let mut raw = ConfigFileBuilder::new()
        .with_task(TaskConfigBuilder::new("Gather", "a.ini").build())
        .raw();
    raw.runner.poll_interval_ms = 0;
    let err = validate_config(&raw).unwrap_err();
    assert!(err.to_string().contains("poll_interval_ms"), "{err}");
}

#[test]
fn drain_grace_below_minimum_is_rejected() {
    let mut raw = ConfigFileBuilder::new()
        .with_task(TaskConfigBuilder::new("Gather", "a.ini").build())
        .raw();
    raw.runner.drain_grace_ms = 0;
    let err = validate_config(&raw).unwrap_err();
    assert!(err.to_string().contains("drain_grace_ms"), "{err}");

    raw.runner.drain_grace_ms = MIN_DRAIN_GRACE_MS;
    assert!(validate_config(&raw).is_ok());
}

#[test]
fn settings_swap_needs_every_path() {
    let raw = ConfigFileBuilder::new()
        .with_task(
            TaskConfigBuilder::new("Compile", "c.ini")
                .without_project_file()
                .build(),
        )
        .raw();
    let err = validate_config(&raw).unwrap_err().to_string();
    assert!(err.contains("global_settings"), "{err}");
    assert!(err.contains("project_settings"), "{err}");
    assert!(err.contains("backup_dir"), "{err}");

    let raw = ConfigFileBuilder::new()
        .with_task(
            TaskConfigBuilder::new("Compile", "c.ini")
                .without_project_file()
                .build(),
        )
        .with_settings_files("global.ini", "project.ini", "backup")
        .raw();
    assert!(validate_config(&raw).is_ok());
}

#[test]
fn pipeline_run_needs_a_spreadsheet() {
    let mut raw = ConfigFileBuilder::new()
        .with_pipeline("Game", "Config/Localization", "Content/Python")
        .raw();
    raw.selection.spreadsheet = None;
    let err = validate_config(&raw).unwrap_err();
    assert!(err.to_string().contains("spreadsheet"), "{err}");

    // An explicit task list replaces the pipeline, so no selection is needed.
    raw.task.push(TaskConfigBuilder::new("Gather", "a.ini").build());
    assert!(validate_config(&raw).is_ok());
}
