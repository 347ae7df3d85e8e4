// src/exec/launcher.rs

//! Pluggable process launcher.
//!
//! The runner asks a [`ProcessLauncher`] for the `Command` to run for an
//! [`Invocation`]; [`launch`] then wires the output pipe, spawns the child and
//! starts its log pump. Production uses [`CommandletLauncher`], which runs the
//! editor executable directly. Tests provide launchers that run shell scripts
//! instead, without touching the pipe/pump plumbing.

use std::io::{self, PipeReader};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::errors::{LocimportError, Result};
use crate::exec::invocation::Invocation;
use crate::exec::log_pump::{spawn_log_pump, PendingLog};
use crate::exec::process::ProcessHandle;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Trait abstracting which OS command runs for an invocation.
pub trait ProcessLauncher: Send {
    fn command(&mut self, invocation: &Invocation) -> Command;
}

/// Runs the editor executable with the invocation's arguments, inheriting
/// the working directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandletLauncher;

impl ProcessLauncher for CommandletLauncher {
    fn command(&mut self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        cmd
    }
}

/// Spawn the process for `task` and start draining its output into
/// `pending`.
///
/// stdout and stderr share one pipe, so the log keeps the order in which the
/// process interleaved them. Any failure to create the pipe or the process is
/// a [`LocimportError::LaunchFailure`]; no process is left behind in that
/// case.
pub fn launch<L: ProcessLauncher + ?Sized>(
    launcher: &mut L,
    task: &str,
    invocation: &Invocation,
    pending: PendingLog,
    drain_grace: Duration,
) -> Result<ProcessHandle> {
    let failure = |reason: String| LocimportError::LaunchFailure {
        task: task.to_string(),
        reason,
    };

    let (reader, writer) = io::pipe().map_err(|e| failure(format!("creating output pipe: {e}")))?;
    let stderr_writer = writer
        .try_clone()
        .map_err(|e| failure(format!("sharing output pipe: {e}")))?;

    let mut cmd = launcher.command(invocation);
    cmd.stdin(Stdio::null())
        .stdout(writer)
        .stderr(stderr_writer)
        .kill_on_drop(true);
    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    let spawned = cmd.spawn();
    // The command holds our copies of the write end; EOF needs them closed.
    drop(cmd);
    let child = spawned.map_err(|e| failure(e.to_string()))?;

    // Dropping the child on error kills it.
    let output = output_reader(reader).map_err(|e| failure(format!("reading output pipe: {e}")))?;

    info!(task = %task, pid = ?child.id(), cmd = %invocation.command_line(), "process started");

    let (exit_tx, exit_rx) = watch::channel(None);
    let pump = spawn_log_pump(task.to_string(), output, pending, exit_rx);
    debug!(task = %task, "log pump attached");

    Ok(ProcessHandle::new(task.to_string(), child, pump, exit_tx, drain_grace))
}

#[cfg(unix)]
fn output_reader(reader: PipeReader) -> io::Result<tokio::net::unix::pipe::Receiver> {
    tokio::net::unix::pipe::Receiver::from_owned_fd(std::os::fd::OwnedFd::from(reader))
}

// Anonymous pipes cannot be registered with the IOCP reactor; reads go through
// the blocking pool instead.
#[cfg(windows)]
fn output_reader(reader: PipeReader) -> io::Result<tokio::fs::File> {
    let handle = std::os::windows::io::OwnedHandle::from(reader);
    Ok(tokio::fs::File::from_std(std::fs::File::from(handle)))
}
