// src/exec/invocation.rs

//! Turning a [`Task`] into the command line of a commandlet process.

use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, DEFAULT_SCRIPT_MARKER};
use crate::env::SourceControlSettings;
use crate::queue::Task;

/// Commandlet that runs gather/export/import/report/compile config files.
pub const GATHER_TEXT_COMMANDLET: &str = "GatherText";
/// Commandlet that runs a literal script body.
pub const SCRIPT_COMMANDLET: &str = "pythonscript";

/// How a task's `script_path` is passed to the commandlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationKind {
    /// `script_path` is a config file: `-config="<path>"`.
    Commandlet,
    /// `script_path` is a literal script body: `-script="<body>"`.
    Script,
}

impl InvocationKind {
    pub fn detect(script_path: &str, marker: &str) -> Self {
        if script_path.contains(marker) {
            InvocationKind::Script
        } else {
            InvocationKind::Commandlet
        }
    }

    pub fn commandlet(self) -> &'static str {
        match self {
            InvocationKind::Commandlet => GATHER_TEXT_COMMANDLET,
            InvocationKind::Script => SCRIPT_COMMANDLET,
        }
    }
}

/// Fully resolved process invocation for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    /// Arguments exactly as handed to the OS.
    pub args: Vec<String>,
    pub kind: InvocationKind,
    command_line: String,
}

impl Invocation {
    /// Human-readable command line, with quoted values as the commandlet
    /// sees them (`-config="..."`).
    pub fn command_line(&self) -> &str {
        &self.command_line
    }
}

/// Builds [`Invocation`]s from task descriptors.
#[derive(Debug, Clone)]
pub struct InvocationBuilder {
    program: PathBuf,
    project: Option<PathBuf>,
    extra_args: Vec<String>,
    script_marker: String,
}

impl InvocationBuilder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            project: None,
            extra_args: Vec::new(),
            script_marker: DEFAULT_SCRIPT_MARKER.to_string(),
        }
    }

    pub fn with_project(mut self, project: impl Into<PathBuf>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_extra_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.extra_args.extend(args);
        self
    }

    pub fn with_script_marker(mut self, marker: impl Into<String>) -> Self {
        self.script_marker = marker.into();
        self
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut builder = Self::new(cfg.editor.executable.clone())
            .with_extra_args(cfg.editor.extra_args.iter().cloned())
            .with_script_marker(cfg.runner.script_marker.clone());
        if let Some(project) = &cfg.editor.project {
            builder = builder.with_project(project.clone());
        }
        builder
    }

    pub fn kind_of(&self, task: &Task) -> InvocationKind {
        InvocationKind::detect(&task.script_path, &self.script_marker)
    }

    /// Resolve the invocation for `task`.
    ///
    /// The result depends only on the task, this builder and the
    /// source-control settings passed in.
    pub fn build(&self, task: &Task, scc: SourceControlSettings) -> Invocation {
        let kind = self.kind_of(task);
        let mut args = Vec::new();
        let mut shown = vec![quote_if_needed(&self.program.to_string_lossy())];

        let project = self.project.as_ref().filter(|_| task.use_project_file);
        if let Some(project) = project {
            let project = project.to_string_lossy().into_owned();
            shown.push(format!("\"{project}\""));
            args.push(project);
        }

        let run = format!("-run={}", kind.commandlet());
        shown.push(run.clone());
        args.push(run);

        let (key, value) = match kind {
            InvocationKind::Commandlet => ("-config", self.config_path_for(task)),
            InvocationKind::Script => ("-script", task.script_path.clone()),
        };
        shown.push(format!("{key}=\"{value}\""));
        args.push(format!("{key}={value}"));

        for flag in scc_flags(scc).into_iter().chain(self.extra_args.iter().map(String::as_str)) {
            shown.push(flag.to_string());
            args.push(flag.to_string());
        }

        Invocation {
            program: self.program.clone(),
            args,
            kind,
            command_line: shown.join(" "),
        }
    }

    /// Config paths under the project directory are passed relative to it
    /// when the commandlet runs with the project file.
    fn config_path_for(&self, task: &Task) -> String {
        let path = Path::new(&task.script_path);
        let project_dir = self
            .project
            .as_ref()
            .filter(|_| task.use_project_file)
            .and_then(|p| p.parent())
            .filter(|dir| !dir.as_os_str().is_empty());

        match project_dir.and_then(|dir| path.strip_prefix(dir).ok()) {
            Some(relative) => relative.to_string_lossy().into_owned(),
            None => task.script_path.clone(),
        }
    }
}

fn scc_flags(scc: SourceControlSettings) -> Vec<&'static str> {
    let mut flags = Vec::new();
    if scc.enabled {
        flags.push("-EnableSCC");
        if !scc.auto_submit {
            flags.push("-DisableSCCSubmit");
        }
    }
    flags
}

fn quote_if_needed(s: &str) -> String {
    if s.contains(char::is_whitespace) {
        format!("\"{s}\"")
    } else {
        s.to_string()
    }
}
