// src/report.rs

//! Final summary and saved logs.

use std::fmt::Write as _;
use std::path::Path;

use tracing::info;

use crate::engine::QueueSnapshot;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::{QueueState, TaskState};

/// Process exit code for a finished queue: 0 on success, 130 when cancelled,
/// 1 otherwise.
pub fn exit_code(state: QueueState) -> i32 {
    match state {
        QueueState::Completed | QueueState::Idle => 0,
        QueueState::Cancelled => 130,
        QueueState::Running | QueueState::Halted { .. } => 1,
    }
}

pub fn verdict(snapshot: &QueueSnapshot) -> String {
    match snapshot.state {
        QueueState::Completed if snapshot.was_successful => {
            format!("All {} tasks succeeded.", snapshot.total)
        }
        QueueState::Halted { failed_index } => {
            let name = snapshot
                .tasks
                .get(failed_index)
                .map(|t| t.name.as_str())
                .unwrap_or("?");
            format!(
                "Task {}/{} '{name}' failed; remaining tasks were not run.",
                failed_index + 1,
                snapshot.total
            )
        }
        QueueState::Cancelled => format!(
            "Cancelled during task {}/{}.",
            (snapshot.current_index + 1).min(snapshot.total),
            snapshot.total
        ),
        state => format!("Queue {state}."),
    }
}

/// One status line per task followed by the verdict.
pub fn render_summary(snapshot: &QueueSnapshot) -> String {
    let mut out = String::new();
    for (i, task) in snapshot.tasks.iter().enumerate() {
        let marker = match task.state {
            TaskState::Succeeded => "ok",
            TaskState::Failed => "FAILED",
            TaskState::InProgress => "stopped",
            TaskState::Queued => "skipped",
        };
        let _ = write!(out, "[{}/{}] {:<8} {}", i + 1, snapshot.total, marker, task.name);
        if let Some(code) = task.exit_code {
            let _ = write!(out, " (exit {code})");
        }
        out.push('\n');
    }
    out.push_str(&verdict(snapshot));
    out.push('\n');
    out
}

/// Every task's invocation and captured output, in queue order. Tasks that
/// never started are left out.
pub fn render_logs(snapshot: &QueueSnapshot) -> String {
    let mut out = String::new();
    for (i, task) in snapshot.tasks.iter().enumerate() {
        if task.state == TaskState::Queued {
            continue;
        }
        let _ = writeln!(
            out,
            "===== [{}/{}] {} ({}) =====",
            i + 1,
            snapshot.total,
            task.name,
            task.state
        );
        if let Some(invocation) = &task.invocation {
            let _ = writeln!(out, "$ {invocation}");
        }
        out.push_str(&task.log);
        if !task.log.is_empty() && !task.log.ends_with('\n') {
            out.push('\n');
        }
    }
    let _ = writeln!(out, "===== {} =====", verdict(snapshot));
    out
}

/// Write [`render_logs`] to `path`.
pub fn save_logs<F: FileSystem + ?Sized>(
    fs: &F,
    path: &Path,
    snapshot: &QueueSnapshot,
) -> Result<()> {
    fs.write(path, render_logs(snapshot).as_bytes())?;
    info!(path = ?path, "task logs saved");
    Ok(())
}
