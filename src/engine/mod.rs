// src/engine/mod.rs

//! Queue execution engine.
//!
//! The pure sequencing semantics live in [`crate::queue::Sequencer`]; this
//! module is the async/IO shell around it:
//! - [`runner`] owns the live process, polls it for completion, moves
//!   captured output into task logs and applies the environment side effects
//!   around each task.
//! - Observers follow progress through [`QueueEvent`]s or a one-off
//!   [`QueueSnapshot`].

use std::time::Duration;

use crate::config::model::RunnerSection;
use crate::types::{QueueState, TaskState};

pub mod runner;

pub use runner::QueueRunner;

/// Timing knobs for the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Period of the completion poller.
    pub poll_interval: Duration,
    /// Upper bound on waiting for the log pump once the process exited.
    pub drain_grace: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self::from(&RunnerSection::default())
    }
}

impl From<&RunnerSection> for RunnerOptions {
    fn from(section: &RunnerSection) -> Self {
        Self {
            poll_interval: Duration::from_millis(section.poll_interval_ms),
            drain_grace: Duration::from_millis(section.drain_grace_ms),
        }
    }
}

/// Progress notifications pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// The process for a task was spawned.
    TaskStarted {
        index: usize,
        name: String,
        invocation: String,
    },
    /// New output was appended to a task's log.
    LogAppended { index: usize, text: String },
    /// A task reached a terminal state.
    TaskFinished {
        index: usize,
        name: String,
        state: TaskState,
        exit_code: Option<i32>,
    },
    /// The queue will not launch anything else.
    QueueFinished { state: QueueState, successful: bool },
}

/// Read-only view of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub name: String,
    pub state: TaskState,
    pub log: String,
    pub invocation: Option<String>,
    pub exit_code: Option<i32>,
}

/// Read-only view of the whole queue at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub state: QueueState,
    pub current_index: usize,
    pub total: usize,
    pub is_complete: bool,
    pub was_successful: bool,
    pub progress: f32,
    pub tasks: Vec<TaskView>,
}
