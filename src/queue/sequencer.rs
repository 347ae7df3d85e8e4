// src/queue/sequencer.rs

//! Pure task sequencer state machine.
//!
//! The sequencer owns the ordered task runs and the cursor, and decides what
//! happens at every task boundary. It never touches processes, channels or
//! the filesystem: it consumes notifications (`on_launched`,
//! `on_process_exit`, ...) and returns [`SequencerCommand`]s for the IO shell
//! (`engine::QueueRunner`) to carry out.
//!
//! Invariants:
//! - the cursor never moves backwards;
//! - at most one run is `InProgress`;
//! - after a halt or a cancel no further `Launch` is ever emitted.

use tracing::{debug, info, warn};

use crate::queue::task::{Task, TaskFailure, TaskRun};
use crate::types::{QueueState, TaskState};

/// Command produced by the sequencer, executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerCommand {
    /// Launch the task at this index.
    Launch { index: usize },
    /// The queue reached a final state; nothing else will be launched.
    Finished(QueueState),
}

#[derive(Debug, Clone)]
pub struct Sequencer {
    runs: Vec<TaskRun>,
    cursor: usize,
    state: QueueState,
}

impl Sequencer {
    pub fn new(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self {
            runs: tasks.into_iter().map(TaskRun::new).collect(),
            cursor: 0,
            state: QueueState::Idle,
        }
    }

    /// Begin executing the queue.
    ///
    /// An empty queue completes immediately and counts as successful.
    pub fn start(&mut self) -> Vec<SequencerCommand> {
        if self.state != QueueState::Idle {
            debug!(state = %self.state, "start ignored; queue already started");
            return Vec::new();
        }

        if self.runs.is_empty() {
            info!("queue is empty; completing immediately");
            self.state = QueueState::Completed;
            return vec![SequencerCommand::Finished(self.state)];
        }

        info!(total = self.runs.len(), "starting task queue");
        self.state = QueueState::Running;
        vec![SequencerCommand::Launch { index: 0 }]
    }

    /// The shell started the process for `index`.
    pub fn on_launched(&mut self, index: usize, invocation: impl Into<String>) {
        if !self.accepts(index) {
            return;
        }
        let run = &mut self.runs[index];
        if run.state != TaskState::Queued {
            warn!(task = %run.task.name, index, state = %run.state, "launch reported for a task that is not queued");
            return;
        }
        run.state = TaskState::InProgress;
        run.invocation = Some(invocation.into());
        debug!(task = %run.task.name, index, "task in progress");
    }

    /// The shell could not start the process for `index`. The task fails
    /// without ever being `InProgress` and the queue halts.
    pub fn on_launch_failed(
        &mut self,
        index: usize,
        reason: impl Into<String>,
    ) -> Vec<SequencerCommand> {
        if !self.accepts(index) {
            return Vec::new();
        }
        let run = &mut self.runs[index];
        let reason = reason.into();
        warn!(task = %run.task.name, index, %reason, "task failed to launch; halting queue");
        run.state = TaskState::Failed;
        run.failure = Some(TaskFailure::Launch(reason));
        self.state = QueueState::Halted {
            failed_index: index,
        };
        vec![SequencerCommand::Finished(self.state)]
    }

    /// The current task's process exited with `code`.
    ///
    /// Zero marks the run `Succeeded` and advances to the next task; anything
    /// else marks it `Failed` and halts the queue with the cursor left on it.
    pub fn on_process_exit(&mut self, code: i32) -> Vec<SequencerCommand> {
        if self.state != QueueState::Running {
            debug!(state = %self.state, code, "exit code ignored; queue not running");
            return Vec::new();
        }
        let index = self.cursor;
        let Some(run) = self.runs.get_mut(index) else {
            return Vec::new();
        };
        if run.state != TaskState::InProgress {
            warn!(task = %run.task.name, index, state = %run.state, "exit code for a task that is not in progress");
            return Vec::new();
        }

        run.exit_code = Some(code);

        if code != 0 {
            info!(task = %run.task.name, index, exit_code = code, "task failed; halting queue");
            run.state = TaskState::Failed;
            run.failure = Some(TaskFailure::ExitCode(code));
            self.state = QueueState::Halted {
                failed_index: index,
            };
            return vec![SequencerCommand::Finished(self.state)];
        }

        info!(task = %run.task.name, index, "task succeeded");
        run.state = TaskState::Succeeded;
        self.cursor += 1;

        if self.cursor < self.runs.len() {
            vec![SequencerCommand::Launch { index: self.cursor }]
        } else {
            info!("all tasks succeeded");
            self.state = QueueState::Completed;
            vec![SequencerCommand::Finished(self.state)]
        }
    }

    /// Stop the queue. Task records are left exactly as they are; only the
    /// queue state changes.
    pub fn cancel(&mut self) -> Vec<SequencerCommand> {
        match self.state {
            QueueState::Idle | QueueState::Running => {
                info!(index = self.cursor, "queue cancelled");
                self.state = QueueState::Cancelled;
                vec![SequencerCommand::Finished(self.state)]
            }
            _ => Vec::new(),
        }
    }

    /// Append captured output to the task under the cursor.
    pub fn append_log(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.runs.get_mut(self.cursor) {
            Some(run) => run.append_log(text),
            None => debug!(bytes = text.len(), "dropping output with no current task"),
        }
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.runs.len()
    }

    /// Cursor reached the end of the queue.
    pub fn is_complete(&self) -> bool {
        self.cursor == self.runs.len()
    }

    /// No further task will be launched.
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Completed and every run succeeded. Vacuously true for an empty queue
    /// that was started.
    pub fn was_successful(&self) -> bool {
        self.state == QueueState::Completed
            && self.is_complete()
            && self.runs.iter().all(|r| r.state == TaskState::Succeeded)
    }

    /// Fraction of tasks passed, in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        if self.runs.is_empty() {
            return 1.0;
        }
        self.cursor as f32 / self.runs.len() as f32
    }

    pub fn runs(&self) -> &[TaskRun] {
        &self.runs
    }

    pub fn run(&self, index: usize) -> Option<&TaskRun> {
        self.runs.get(index)
    }

    pub fn current_run(&self) -> Option<&TaskRun> {
        self.runs.get(self.cursor)
    }

    fn accepts(&self, index: usize) -> bool {
        if self.state != QueueState::Running {
            debug!(state = %self.state, index, "notification ignored; queue not running");
            return false;
        }
        if index != self.cursor {
            warn!(index, cursor = self.cursor, "notification for a task other than the current one");
            return false;
        }
        true
    }
}
