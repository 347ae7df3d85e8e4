// src/engine/runner.rs

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::engine::{QueueEvent, QueueSnapshot, RunnerOptions, TaskView};
use crate::env::EnvironmentAdapter;
use crate::exec::{launch, InvocationBuilder, PendingLog, ProcessHandle, ProcessLauncher};
use crate::queue::{Sequencer, SequencerCommand, Task};
use crate::types::QueueState;

/// The task currently owning a process.
struct ActiveTask {
    index: usize,
    handle: ProcessHandle,
    pending: PendingLog,
    /// Ran without the project file, so the global settings must be put back
    /// once the process exits.
    restore_settings: bool,
}

/// Drives a [`Sequencer`] against real processes.
///
/// This is the IO shell around the sequencer: it launches the processes the
/// sequencer asks for, polls for their exit, moves captured output into the
/// task logs and reports back. All queue semantics stay in the sequencer.
///
/// `poll` and `cancel` take `&mut self`, so a poll can never overlap a
/// cancel.
pub struct QueueRunner<L: ProcessLauncher, E: EnvironmentAdapter> {
    sequencer: Sequencer,
    launcher: L,
    env: E,
    invocations: InvocationBuilder,
    options: RunnerOptions,
    active: Option<ActiveTask>,
    subscribers: Vec<mpsc::UnboundedSender<QueueEvent>>,
}

impl<L: ProcessLauncher, E: EnvironmentAdapter> fmt::Debug for QueueRunner<L, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueRunner")
            .field("sequencer", &self.sequencer)
            .field("options", &self.options)
            .field("active", &self.active.as_ref().map(|a| a.index))
            .finish_non_exhaustive()
    }
}

impl<L: ProcessLauncher, E: EnvironmentAdapter> QueueRunner<L, E> {
    pub fn new(
        tasks: impl IntoIterator<Item = Task>,
        launcher: L,
        env: E,
        invocations: InvocationBuilder,
        options: RunnerOptions,
    ) -> Self {
        Self {
            sequencer: Sequencer::new(tasks),
            launcher,
            env,
            invocations,
            options,
            active: None,
            subscribers: Vec::new(),
        }
    }

    /// Receive every [`QueueEvent`] emitted from now on.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<QueueEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn is_finished(&self) -> bool {
        self.sequencer.is_finished()
    }

    /// Start the queue by launching its first task.
    pub fn start(&mut self) {
        let commands = self.sequencer.start();
        self.execute(commands);
    }

    /// Completion poller tick.
    ///
    /// Moves pending output into the current task's log. If the process has
    /// exited, waits for the log pump to drain the pipe, moves the remainder
    /// in, restores the environment if needed and hands the exit code to the
    /// sequencer (which may launch the next task). A no-op when no process is
    /// live, so extra ticks before launch or after the queue finished are
    /// harmless.
    pub async fn poll(&mut self) {
        let exited = {
            let Some(active) = self.active.as_mut() else {
                return;
            };
            let (index, pending) = (active.index, active.pending.clone());
            let status = active.handle.try_exit_code();
            self.drain(index, &pending);
            status
        };

        let code = match exited {
            Ok(None) => return,
            Ok(Some(_)) => None,
            Err(e) => {
                error!(error = %e, "failed to query process status; treating task as failed");
                Some(-1)
            }
        };

        let Some(mut active) = self.active.take() else {
            return;
        };

        let code = match code {
            Some(code) => {
                active.handle.terminate().await;
                code
            }
            None => match active.handle.finish().await {
                Ok(exit) => exit.exit_code,
                Err(e) => {
                    error!(task = %active.handle.task(), error = %e, "failed to collect exit status");
                    -1
                }
            },
        };

        // Everything the process wrote before exiting belongs to this task.
        self.drain(active.index, &active.pending);
        drop(active.handle);

        if active.restore_settings {
            self.restore_environment(active.index);
        }

        let commands = self.sequencer.on_process_exit(code);
        self.emit_task_finished(active.index);
        self.execute(commands);
    }

    /// Stop the queue: kill the live process (if any), keep the output it
    /// produced, and launch nothing further.
    ///
    /// Settings swapped in for the running task are left in place; the backup
    /// stays where it was written.
    pub async fn cancel(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.handle.terminate().await;
            self.drain(active.index, &active.pending);
            if active.restore_settings {
                warn!(
                    index = active.index,
                    "queue cancelled while project source control settings were swapped in; \
                     global settings are not restored"
                );
            }
        }
        let commands = self.sequencer.cancel();
        self.execute(commands);
    }

    /// Start (if idle) and poll on a fixed interval until the queue finishes.
    /// Resolving `shutdown` cancels the queue.
    pub async fn run_until_finished<F>(&mut self, shutdown: F) -> QueueSnapshot
    where
        F: Future<Output = ()>,
    {
        if self.sequencer.state() == QueueState::Idle {
            self.start();
        }

        let mut ticker = tokio::time::interval(self.options.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        let mut shutdown_seen = false;

        while !self.sequencer.is_finished() {
            tokio::select! {
                _ = ticker.tick() => self.poll().await,
                _ = &mut shutdown, if !shutdown_seen => {
                    shutdown_seen = true;
                    info!("shutdown requested; cancelling queue");
                    self.cancel().await;
                }
            }
        }

        self.snapshot()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let tasks = self
            .sequencer
            .runs()
            .iter()
            .map(|run| TaskView {
                name: run.task.name.clone(),
                state: run.state,
                log: run.log.clone(),
                invocation: run.invocation.clone(),
                exit_code: run.exit_code,
            })
            .collect();

        QueueSnapshot {
            state: self.sequencer.state(),
            current_index: self.sequencer.current_index(),
            total: self.sequencer.total(),
            is_complete: self.sequencer.is_complete(),
            was_successful: self.sequencer.was_successful(),
            progress: self.sequencer.progress(),
            tasks,
        }
    }

    fn execute(&mut self, commands: Vec<SequencerCommand>) {
        let mut queue: VecDeque<_> = commands.into();
        while let Some(command) = queue.pop_front() {
            debug!(?command, "executing sequencer command");
            match command {
                SequencerCommand::Launch { index } => queue.extend(self.launch_task(index)),
                SequencerCommand::Finished(state) => {
                    info!(%state, "queue finished");
                    self.emit(QueueEvent::QueueFinished {
                        state,
                        successful: self.sequencer.was_successful(),
                    });
                }
            }
        }
    }

    fn launch_task(&mut self, index: usize) -> Vec<SequencerCommand> {
        let Some(task) = self.sequencer.run(index).map(|r| r.task.clone()) else {
            warn!(index, "launch requested for an unknown task");
            return Vec::new();
        };

        let restore_settings = !task.use_project_file;
        if restore_settings {
            if let Err(e) = self.env.swap_in_project_settings() {
                warn!(task = %task.name, error = %e, "could not swap in project source control settings");
            }
        }

        let invocation = self.invocations.build(&task, self.env.source_control());
        let pending = PendingLog::new();

        match launch(
            &mut self.launcher,
            &task.name,
            &invocation,
            pending.clone(),
            self.options.drain_grace,
        ) {
            Ok(handle) => {
                self.sequencer.on_launched(index, invocation.command_line());
                self.active = Some(ActiveTask {
                    index,
                    handle,
                    pending,
                    restore_settings,
                });
                self.emit(QueueEvent::TaskStarted {
                    index,
                    name: task.name,
                    invocation: invocation.command_line().to_string(),
                });
                Vec::new()
            }
            Err(e) => {
                error!(task = %task.name, index, error = %e, "task launch failed");
                if restore_settings {
                    self.restore_environment(index);
                }
                let commands = self.sequencer.on_launch_failed(index, e.to_string());
                self.emit_task_finished(index);
                commands
            }
        }
    }

    fn restore_environment(&mut self, index: usize) {
        if let Err(e) = self.env.restore_global_settings() {
            warn!(index, error = %e, "could not restore global source control settings");
        }
    }

    /// Move pending output of the task at `index` into its log.
    fn drain(&mut self, index: usize, pending: &PendingLog) {
        let text = pending.take();
        if text.is_empty() {
            return;
        }
        if self.sequencer.current_index() != index {
            warn!(index, bytes = text.len(), "dropping output for a task that is no longer current");
            return;
        }
        self.sequencer.append_log(&text);
        self.emit(QueueEvent::LogAppended { index, text });
    }

    fn emit_task_finished(&mut self, index: usize) {
        let Some(run) = self.sequencer.run(index) else {
            return;
        };
        if !run.state.is_terminal() {
            return;
        }
        let event = QueueEvent::TaskFinished {
            index,
            name: run.task.name.clone(),
            state: run.state,
            exit_code: run.exit_code,
        };
        self.emit(event);
    }

    fn emit(&mut self, event: QueueEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
