use std::fmt;

/// Lifecycle of a single task run.
///
/// `Queued → InProgress → {Succeeded | Failed}`. A task whose launch fails goes
/// straight from `Queued` to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Queued,
    InProgress,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Queued => "queued",
            TaskState::InProgress => "in progress",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Queue-level state derived from the cursor and the task runs.
///
/// - `Idle`: built but not started.
/// - `Running`: cursor < total and nothing failed yet.
/// - `Completed`: cursor == total, every run succeeded.
/// - `Halted`: a run failed; the cursor stays on it.
/// - `Cancelled`: stopped by the user; distinct from a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueState {
    #[default]
    Idle,
    Running,
    Completed,
    Halted { failed_index: usize },
    Cancelled,
}

impl QueueState {
    /// True once no further task will ever be launched.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            QueueState::Completed | QueueState::Halted { .. } | QueueState::Cancelled
        )
    }
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueState::Idle => f.write_str("idle"),
            QueueState::Running => f.write_str("running"),
            QueueState::Completed => f.write_str("completed"),
            QueueState::Halted { failed_index } => write!(f, "halted at task {failed_index}"),
            QueueState::Cancelled => f.write_str("cancelled"),
        }
    }
}
