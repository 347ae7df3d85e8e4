mod common;
use crate::common::TestResult;

use locimport::engine::{QueueSnapshot, TaskView};
use locimport::fs::mock::MockFileSystem;
use locimport::report::{exit_code, render_logs, render_summary, save_logs, verdict};
use locimport::types::{QueueState, TaskState};

fn view(name: &str, state: TaskState, log: &str, exit_code: Option<i32>) -> TaskView {
    TaskView {
        name: name.to_string(),
        state,
        log: log.to_string(),
        invocation: (state != TaskState::Queued).then(|| format!("editor -run={name}")),
        exit_code,
    }
}

fn halted_snapshot() -> QueueSnapshot {
    QueueSnapshot {
        state: QueueState::Halted { failed_index: 1 },
        current_index: 1,
        total: 3,
        is_complete: false,
        was_successful: false,
        progress: 1.0 / 3.0,
        tasks: vec![
            view("Gather", TaskState::Succeeded, "gathered\n", Some(0)),
            view("Export", TaskState::Failed, "Error: no data", Some(2)),
            view("Import", TaskState::Queued, "", None),
        ],
    }
}

#[test]
fn exit_codes_by_queue_state() {
    assert_eq!(exit_code(QueueState::Completed), 0);
    assert_eq!(exit_code(QueueState::Idle), 0);
    assert_eq!(exit_code(QueueState::Halted { failed_index: 0 }), 1);
    assert_eq!(exit_code(QueueState::Cancelled), 130);
}

#[test]
fn summary_lists_every_task_and_names_the_failure() {
    let summary = render_summary(&halted_snapshot());
    let lines: Vec<_> = summary.lines().collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "[1/3] ok       Gather (exit 0)");
    assert_eq!(lines[1], "[2/3] FAILED   Export (exit 2)");
    assert_eq!(lines[2], "[3/3] skipped  Import");
    assert_eq!(lines[3], "Task 2/3 'Export' failed; remaining tasks were not run.");
}

#[test]
fn verdict_for_cancel_and_success() {
    let mut snapshot = halted_snapshot();
    snapshot.state = QueueState::Cancelled;
    assert_eq!(verdict(&snapshot), "Cancelled during task 2/3.");

    snapshot.state = QueueState::Completed;
    snapshot.was_successful = true;
    assert_eq!(verdict(&snapshot), "All 3 tasks succeeded.");
}

#[test]
fn saved_log_has_started_tasks_only() -> TestResult {
    let fs = MockFileSystem::new();
    let snapshot = halted_snapshot();
    save_logs(&fs, "/tmp/locimport.log".as_ref(), &snapshot)?;

    let saved = fs.contents("/tmp/locimport.log").ok_or("log not written")?;
    assert_eq!(saved, render_logs(&snapshot));
    assert_eq!(
        saved,
        "===== [1/3] Gather (succeeded) =====\n\
         $ editor -run=Gather\n\
         gathered\n\
         ===== [2/3] Export (failed) =====\n\
         $ editor -run=Export\n\
         Error: no data\n\
         ===== Task 2/3 'Export' failed; remaining tasks were not run. =====\n"
    );
    Ok(())
}
