// src/queue/task.rs

//! Task descriptors and their per-run records.

use crate::config::model::TaskConfig;
use crate::types::TaskState;

/// Immutable description of one pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Display name, e.g. "Gather Text".
    pub name: String,
    /// Commandlet config path, or a literal script body.
    pub script_path: String,
    /// Run with the project file (full project context) rather than the
    /// reduced engine-only context.
    pub use_project_file: bool,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        script_path: impl Into<String>,
        use_project_file: bool,
    ) -> Self {
        Self {
            name: name.into(),
            script_path: script_path.into(),
            use_project_file,
        }
    }
}

impl From<&TaskConfig> for Task {
    fn from(cfg: &TaskConfig) -> Self {
        Task::new(cfg.name.clone(), cfg.script_path.clone(), cfg.use_project_file)
    }
}

/// Why a task ended up `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    /// The process could not be started at all.
    Launch(String),
    /// The process ran and exited with a non-zero code.
    ExitCode(i32),
}

/// Runtime record for one task. Lives as long as the queue so history stays
/// visible after later tasks run.
#[derive(Debug, Clone)]
pub struct TaskRun {
    pub task: Task,
    pub state: TaskState,
    /// Captured output. Append-only.
    pub log: String,
    /// Resolved command line, once launched.
    pub invocation: Option<String>,
    pub exit_code: Option<i32>,
    pub failure: Option<TaskFailure>,
}

impl TaskRun {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            state: TaskState::Queued,
            log: String::new(),
            invocation: None,
            exit_code: None,
            failure: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.task.name
    }

    pub(crate) fn append_log(&mut self, text: &str) {
        self.log.push_str(text);
    }
}
