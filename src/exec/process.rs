// src/exec/process.rs

//! Ownership of one live commandlet process and its log pump.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::log_pump::PumpSummary;

/// How a finished process ended, as seen by the poller and by the pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub exit_code: i32,
    /// `None` when the pump had to be abandoned.
    pub pump: Option<PumpSummary>,
}

/// Exclusive owner of a running process and the pump draining its output.
///
/// Exit codes observed here are published to the pump, which reports the
/// code back in its [`PumpSummary`] once the output pipe is empty.
///
/// Dropping the handle kills the process if it is still running (the child
/// is spawned with `kill_on_drop`) and aborts the pump, so neither outlives
/// the handle. Prefer [`ProcessHandle::finish`] or
/// [`ProcessHandle::terminate`], which also wait for the pump.
#[derive(Debug)]
pub struct ProcessHandle {
    task: String,
    child: Child,
    pump: Option<JoinHandle<PumpSummary>>,
    exit_tx: watch::Sender<Option<i32>>,
    exit_code: Option<i32>,
    drain_grace: Duration,
}

impl ProcessHandle {
    pub(crate) fn new(
        task: String,
        child: Child,
        pump: JoinHandle<PumpSummary>,
        exit_tx: watch::Sender<Option<i32>>,
        drain_grace: Duration,
    ) -> Self {
        Self {
            task,
            child,
            pump: Some(pump),
            exit_tx,
            exit_code: None,
            drain_grace,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// Non-blocking exit check. Returns the same code on every call once the
    /// process has exited.
    pub fn try_exit_code(&mut self) -> Result<Option<i32>> {
        if let Some(code) = self.exit_code {
            return Ok(Some(code));
        }
        match self.child.try_wait()? {
            Some(status) => Ok(Some(self.record_exit(status))),
            None => Ok(None),
        }
    }

    /// Wait for the process to exit, then for the pump to drain the pipe.
    pub async fn finish(&mut self) -> Result<ProcessExit> {
        let exit_code = match self.exit_code {
            Some(code) => code,
            None => {
                let status = self.child.wait().await?;
                self.record_exit(status)
            }
        };
        let pump = self.join_pump().await;
        Ok(ProcessExit { exit_code, pump })
    }

    /// Kill the process if it is still running, then join the pump.
    pub async fn terminate(&mut self) {
        if matches!(self.try_exit_code(), Ok(None)) {
            info!(task = %self.task, pid = ?self.child.id(), "terminating process");
            if let Err(e) = self.child.kill().await {
                warn!(task = %self.task, error = %e, "failed to kill process");
            }
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    self.record_exit(status);
                }
                Ok(None) => {}
                Err(e) => warn!(task = %self.task, error = %e, "no exit status after kill"),
            }
        }
        self.join_pump().await;
    }

    fn record_exit(&mut self, status: ExitStatus) -> i32 {
        let code = exit_code_of(status);
        debug!(task = %self.task, exit_code = code, "process exited");
        self.exit_code = Some(code);
        self.exit_tx.send_replace(Some(code));
        code
    }

    async fn join_pump(&mut self) -> Option<PumpSummary> {
        let mut pump = self.pump.take()?;
        match tokio::time::timeout(self.drain_grace, &mut pump).await {
            Ok(Ok(summary)) => {
                debug!(task = %self.task, bytes = summary.bytes, "log pump joined");
                if summary.exit_code != self.exit_code {
                    warn!(
                        task = %self.task,
                        polled = ?self.exit_code,
                        pumped = ?summary.exit_code,
                        "log pump and poller disagree on the exit code"
                    );
                }
                Some(summary)
            }
            Ok(Err(e)) => {
                warn!(task = %self.task, error = %e, "log pump task failed");
                None
            }
            Err(_) => {
                warn!(
                    task = %self.task,
                    grace_ms = self.drain_grace.as_millis() as u64,
                    "output pipe still open after process exit; abandoning log pump"
                );
                pump.abort();
                None
            }
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

/// Exit codes are only meaningful for normal exits; a process killed by a
/// signal reports `-1`.
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
