#![allow(dead_code)]

use std::path::PathBuf;

use locimport::config::{
    ConfigFile, EditorSection, PipelineSection, RawConfigFile, RunnerSection, SelectionSection,
    SourceControlSection, TaskConfig,
};
use locimport::queue::Task;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                editor: EditorSection {
                    executable: PathBuf::from("UE4Editor-Cmd"),
                    project: None,
                    extra_args: vec![],
                },
                runner: RunnerSection::default(),
                source_control: SourceControlSection::default(),
                pipeline: None,
                selection: SelectionSection::default(),
                task: vec![],
            },
        }
    }

    pub fn with_task(mut self, task: TaskConfig) -> Self {
        self.config.task.push(task);
        self
    }

    pub fn with_project(mut self, project: &str) -> Self {
        self.config.editor.project = Some(PathBuf::from(project));
        self
    }

    pub fn with_extra_arg(mut self, arg: &str) -> Self {
        self.config.editor.extra_args.push(arg.to_string());
        self
    }

    pub fn with_pipeline(mut self, target: &str, config_dir: &str, script_dir: &str) -> Self {
        self.config.pipeline = Some(PipelineSection {
            target: target.to_string(),
            config_dir: PathBuf::from(config_dir),
            script_dir: PathBuf::from(script_dir),
            use_project_file: true,
        });
        self.config.selection.spreadsheet = Some(PathBuf::from("translations.xlsx"));
        self
    }

    pub fn with_source_control(mut self, enabled: bool, auto_submit: bool) -> Self {
        self.config.source_control.enabled = enabled;
        self.config.source_control.auto_submit = auto_submit;
        self
    }

    pub fn with_settings_files(mut self, global: &str, project: &str, backup_dir: &str) -> Self {
        self.config.source_control.global_settings = Some(PathBuf::from(global));
        self.config.source_control.project_settings = Some(PathBuf::from(project));
        self.config.source_control.backup_dir = Some(PathBuf::from(backup_dir));
        self
    }

    pub fn with_script_marker(mut self, marker: &str) -> Self {
        self.config.runner.script_marker = marker.to_string();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(name: &str, script_path: &str) -> Self {
        Self {
            task: TaskConfig {
                name: name.to_string(),
                script_path: script_path.to_string(),
                use_project_file: true,
            },
        }
    }

    pub fn without_project_file(mut self) -> Self {
        self.task.use_project_file = false;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// `n` config-file tasks named `task_0..task_n`.
pub fn numbered_tasks(n: usize) -> Vec<Task> {
    (0..n)
        .map(|i| Task::new(format!("task_{i}"), format!("Config/Task_{i}.ini"), true))
        .collect()
}
