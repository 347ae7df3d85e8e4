#![cfg(unix)]

mod common;
use crate::common::builders::numbered_tasks;
use crate::common::fakes::{Journal, RecordingEnvironment, ShellLauncher, UNLAUNCHABLE};
use crate::common::{drain_events, init_tracing, shell_runner, with_timeout, TestResult};

use std::future::pending;
use std::time::{Duration, Instant};

use locimport::engine::{QueueEvent, QueueRunner, QueueSnapshot};
use locimport::env::{EnvironmentAdapter, SourceControlSettings, StaticEnvironment};
use locimport::exec::{launch, InvocationBuilder, PendingLog, ProcessLauncher};
use locimport::queue::{Task, TaskFailure};
use locimport::types::{QueueState, TaskState};

fn static_env() -> StaticEnvironment {
    StaticEnvironment::new(SourceControlSettings::default())
}

/// Poll until `done` holds for the snapshot.
async fn poll_until<L, E>(runner: &mut QueueRunner<L, E>, done: impl Fn(&QueueSnapshot) -> bool)
where
    L: ProcessLauncher,
    E: EnvironmentAdapter,
{
    with_timeout(async {
        while !done(&runner.snapshot()) {
            runner.poll().await;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}

#[tokio::test]
async fn all_tasks_run_in_order_and_succeed() {
    init_tracing();
    let launcher = ShellLauncher::new(["echo one", "echo two", "echo three"]);
    let launched = launcher.invocations();
    let mut runner = shell_runner(numbered_tasks(3), launcher, static_env());
    let mut events = runner.subscribe();

    let snapshot = with_timeout(runner.run_until_finished(pending())).await;

    assert_eq!(snapshot.state, QueueState::Completed);
    assert!(snapshot.is_complete);
    assert!(snapshot.was_successful);
    assert_eq!(snapshot.current_index, 3);
    let logs: Vec<_> = snapshot.tasks.iter().map(|t| t.log.as_str()).collect();
    assert_eq!(logs, vec!["one\n", "two\n", "three\n"]);
    assert!(snapshot.tasks.iter().all(|t| t.exit_code == Some(0)));
    assert_eq!(launched.lock().unwrap().len(), 3);

    // Lifecycle events arrive task by task.
    let lifecycle: Vec<String> = drain_events(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            QueueEvent::TaskStarted { index, .. } => Some(format!("start {index}")),
            QueueEvent::TaskFinished { index, state, .. } => Some(format!("{state} {index}")),
            QueueEvent::QueueFinished { state, successful } => {
                Some(format!("queue {state} {successful}"))
            }
            QueueEvent::LogAppended { .. } => None,
        })
        .collect();
    assert_eq!(
        lifecycle,
        vec![
            "start 0",
            "succeeded 0",
            "start 1",
            "succeeded 1",
            "start 2",
            "succeeded 2",
            "queue completed true",
        ]
    );
}

#[tokio::test]
async fn failing_task_halts_the_queue() {
    init_tracing();
    let launcher = ShellLauncher::new(["true", "echo boom >&2; exit 4", "echo never"]);
    let launched = launcher.invocations();
    let mut runner = shell_runner(numbered_tasks(3), launcher, static_env());

    let snapshot = with_timeout(runner.run_until_finished(pending())).await;

    assert_eq!(snapshot.state, QueueState::Halted { failed_index: 1 });
    assert_eq!(snapshot.current_index, 1);
    assert!(!snapshot.is_complete);
    assert!(!snapshot.was_successful);

    let failed = &snapshot.tasks[1];
    assert_eq!(failed.state, TaskState::Failed);
    assert_eq!(failed.exit_code, Some(4));
    assert_eq!(failed.log, "boom\n");
    assert_eq!(snapshot.tasks[2].state, TaskState::Queued);
    assert_eq!(snapshot.tasks[2].log, "");
    assert_eq!(launched.lock().unwrap().len(), 2);

    assert_eq!(
        runner.sequencer().run(1).and_then(|r| r.failure.clone()),
        Some(TaskFailure::ExitCode(4))
    );
}

#[tokio::test]
async fn log_is_exact_concatenation_of_output() {
    init_tracing();
    let script = "for i in 1 2 3 4 5; do echo line $i; sleep 0.01; done; printf 'tail-no-newline'";
    let launcher = ShellLauncher::new([script, "echo err-only >&2"]);
    let mut runner = shell_runner(numbered_tasks(2), launcher, static_env());
    let mut events = runner.subscribe();

    let snapshot = with_timeout(runner.run_until_finished(pending())).await;

    assert_eq!(
        snapshot.tasks[0].log,
        "line 1\nline 2\nline 3\nline 4\nline 5\ntail-no-newline"
    );
    assert_eq!(snapshot.tasks[1].log, "err-only\n");

    // Streaming events add up to the same text, per task.
    let mut streamed = vec![String::new(); 2];
    for event in drain_events(&mut events) {
        if let QueueEvent::LogAppended { index, text } = event {
            streamed[index].push_str(&text);
        }
    }
    assert_eq!(streamed[0], snapshot.tasks[0].log);
    assert_eq!(streamed[1], snapshot.tasks[1].log);
}

#[tokio::test]
async fn output_written_just_before_exit_stays_with_its_task() {
    init_tracing();
    let burst = "i=0; while [ $i -lt 200 ]; do echo burst $i; i=$((i+1)); done";
    let launcher = ShellLauncher::new([burst, "echo next"]);
    let mut runner = shell_runner(numbered_tasks(2), launcher, static_env());

    let snapshot = with_timeout(runner.run_until_finished(pending())).await;

    let expected: String = (0..200).map(|i| format!("burst {i}\n")).collect();
    assert_eq!(snapshot.tasks[0].log, expected);
    assert_eq!(snapshot.tasks[1].log, "next\n");
}

#[tokio::test]
async fn stdout_and_stderr_keep_their_interleaving() {
    init_tracing();
    let script = "i=0; while [ $i -lt 300 ]; do echo o$i; echo e$i >&2; i=$((i+1)); done";

    for _ in 0..3 {
        let launcher = ShellLauncher::new([script]);
        let mut runner = shell_runner(numbered_tasks(1), launcher, static_env());

        let snapshot = with_timeout(runner.run_until_finished(pending())).await;

        let expected: String = (0..300).map(|i| format!("o{i}\ne{i}\n")).collect();
        assert_eq!(snapshot.state, QueueState::Completed);
        assert_eq!(snapshot.tasks[0].log, expected);
    }
}

#[tokio::test]
async fn pump_reports_the_same_exit_code_as_the_poller() -> TestResult {
    init_tracing();
    let task = Task::new("Export", "Config/Game_Export.ini", true);
    let invocation = InvocationBuilder::new("editor").build(&task, SourceControlSettings::default());
    let mut launcher = ShellLauncher::new(["echo exporting; echo warning >&2; exit 3"]);
    let log = PendingLog::new();

    let mut handle = launch(
        &mut launcher,
        &task.name,
        &invocation,
        log.clone(),
        Duration::from_secs(2),
    )?;
    let polled = with_timeout(async {
        loop {
            if let Some(code) = handle.try_exit_code()? {
                return Ok::<_, locimport::errors::LocimportError>(code);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    let exit = with_timeout(handle.finish()).await?;

    assert_eq!(polled, 3);
    assert_eq!(exit.exit_code, 3);
    let summary = exit.pump.ok_or("pump was abandoned")?;
    assert_eq!(summary.exit_code, Some(3));
    assert_eq!(summary.bytes, "exporting\nwarning\n".len());
    assert_eq!(log.take(), "exporting\nwarning\n");

    // The runner records the same code for the task.
    let launcher = ShellLauncher::new(["exit 3"]);
    let mut runner = shell_runner(numbered_tasks(1), launcher, static_env());
    let snapshot = with_timeout(runner.run_until_finished(pending())).await;
    assert_eq!(snapshot.tasks[0].exit_code, summary.exit_code);
    Ok(())
}

#[tokio::test]
async fn cancel_stops_the_process_and_launches_nothing_else() {
    init_tracing();
    let launcher = ShellLauncher::new(["echo started; exec sleep 30", "echo never"]);
    let launched = launcher.invocations();
    let mut runner = shell_runner(numbered_tasks(2), launcher, static_env());

    runner.start();
    poll_until(&mut runner, |s| s.tasks[0].log.contains("started")).await;

    let began = Instant::now();
    with_timeout(runner.cancel()).await;
    assert!(began.elapsed() < Duration::from_secs(5));

    let snapshot = runner.snapshot();
    assert_eq!(snapshot.state, QueueState::Cancelled);
    assert_eq!(snapshot.tasks[0].state, TaskState::InProgress);
    assert_eq!(snapshot.tasks[0].log, "started\n");
    assert_eq!(snapshot.tasks[1].state, TaskState::Queued);
    assert!(!snapshot.was_successful);

    // Further polls and cancels change nothing.
    runner.poll().await;
    runner.cancel().await;
    assert_eq!(runner.snapshot(), snapshot);
    assert_eq!(launched.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn shutdown_signal_cancels_a_running_queue() {
    init_tracing();
    let launcher = ShellLauncher::new(["exec sleep 30", "echo never"]);
    let mut runner = shell_runner(numbered_tasks(2), launcher, static_env());

    let shutdown = tokio::time::sleep(Duration::from_millis(100));
    let snapshot = with_timeout(runner.run_until_finished(shutdown)).await;

    assert_eq!(snapshot.state, QueueState::Cancelled);
    assert_eq!(snapshot.current_index, 0);
}

#[tokio::test]
async fn poll_is_a_no_op_before_start_and_after_finish() {
    init_tracing();
    let launcher = ShellLauncher::new(["echo only"]);
    let mut runner = shell_runner(numbered_tasks(1), launcher, static_env());

    let before = runner.snapshot();
    runner.poll().await;
    runner.poll().await;
    assert_eq!(runner.snapshot(), before);
    assert_eq!(before.state, QueueState::Idle);

    let finished = with_timeout(runner.run_until_finished(pending())).await;
    for _ in 0..5 {
        runner.poll().await;
    }
    assert_eq!(runner.snapshot(), finished);
    assert_eq!(finished.tasks[0].log, "only\n");
}

#[tokio::test]
async fn launch_failure_fails_task_and_halts() {
    init_tracing();
    let launcher = ShellLauncher::new([UNLAUNCHABLE, "echo never"]);
    let launched = launcher.invocations();
    let mut runner = shell_runner(numbered_tasks(2), launcher, static_env());
    let mut events = runner.subscribe();

    let snapshot = with_timeout(runner.run_until_finished(pending())).await;

    assert_eq!(snapshot.state, QueueState::Halted { failed_index: 0 });
    assert_eq!(snapshot.tasks[0].state, TaskState::Failed);
    assert_eq!(snapshot.tasks[0].exit_code, None);
    assert_eq!(snapshot.tasks[0].invocation, None);
    assert!(matches!(
        runner.sequencer().run(0).and_then(|r| r.failure.clone()),
        Some(TaskFailure::Launch(_))
    ));
    assert_eq!(launched.lock().unwrap().len(), 1);

    let events = drain_events(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        QueueEvent::TaskFinished { index: 0, state: TaskState::Failed, exit_code: None, .. }
    )));
    assert!(!events.iter().any(|e| matches!(e, QueueEvent::TaskStarted { .. })));
}

#[tokio::test]
async fn settings_are_restored_before_the_next_task_starts() {
    init_tracing();
    let journal = Journal::new();
    let launcher = ShellLauncher::new(["echo compile", "echo report"]).with_journal(journal.clone());
    let env = RecordingEnvironment::new(journal.clone());
    let tasks = vec![
        Task::new("Compile", "Compile.ini", false),
        Task::new("Report", "Report.ini", true),
    ];
    let mut runner = shell_runner(tasks, launcher, env);

    let snapshot = with_timeout(runner.run_until_finished(pending())).await;

    assert!(snapshot.was_successful);
    assert_eq!(journal.entries(), vec!["swap", "launch 0", "restore", "launch 1"]);
}

#[tokio::test]
async fn settings_are_restored_after_a_failing_task() {
    init_tracing();
    let journal = Journal::new();
    let launcher = ShellLauncher::new(["exit 2"]).with_journal(journal.clone());
    let env = RecordingEnvironment::new(journal.clone());
    let mut runner = shell_runner(vec![Task::new("Compile", "Compile.ini", false)], launcher, env);

    let snapshot = with_timeout(runner.run_until_finished(pending())).await;

    assert_eq!(snapshot.state, QueueState::Halted { failed_index: 0 });
    assert_eq!(journal.entries(), vec!["swap", "launch 0", "restore"]);
}

#[tokio::test]
async fn restore_failure_does_not_fail_the_task() {
    init_tracing();
    let journal = Journal::new();
    let launcher = ShellLauncher::new(["true", "true"]).with_journal(journal.clone());
    let mut env = RecordingEnvironment::new(journal.clone());
    env.fail_restore = true;
    let tasks = vec![
        Task::new("Compile", "Compile.ini", false),
        Task::new("Report", "Report.ini", true),
    ];
    let mut runner = shell_runner(tasks, launcher, env);

    let snapshot = with_timeout(runner.run_until_finished(pending())).await;

    assert_eq!(snapshot.state, QueueState::Completed);
    assert!(snapshot.tasks.iter().all(|t| t.state == TaskState::Succeeded));
    assert_eq!(journal.entries(), vec!["swap", "launch 0", "restore", "launch 1"]);
}

#[tokio::test]
async fn launch_failure_restores_swapped_settings() {
    init_tracing();
    let journal = Journal::new();
    let launcher = ShellLauncher::new([UNLAUNCHABLE]).with_journal(journal.clone());
    let env = RecordingEnvironment::new(journal.clone());
    let mut runner = shell_runner(vec![Task::new("Compile", "Compile.ini", false)], launcher, env);

    with_timeout(runner.run_until_finished(pending())).await;

    assert_eq!(journal.entries(), vec!["swap", "launch 0", "restore"]);
}

#[tokio::test]
async fn cancel_leaves_swapped_settings_in_place() {
    init_tracing();
    let journal = Journal::new();
    let launcher = ShellLauncher::new(["exec sleep 30"]).with_journal(journal.clone());
    let env = RecordingEnvironment::new(journal.clone());
    let mut runner = shell_runner(vec![Task::new("Compile", "Compile.ini", false)], launcher, env);

    runner.start();
    runner.poll().await;
    with_timeout(runner.cancel()).await;

    assert_eq!(runner.snapshot().state, QueueState::Cancelled);
    assert_eq!(journal.entries(), vec!["swap", "launch 0"]);
}

#[tokio::test]
async fn empty_queue_completes_without_launching() {
    init_tracing();
    let launcher = ShellLauncher::new(Vec::<String>::new());
    let launched = launcher.invocations();
    let mut runner = shell_runner(Vec::new(), launcher, static_env());

    let snapshot = with_timeout(runner.run_until_finished(pending())).await;

    assert_eq!(snapshot.state, QueueState::Completed);
    assert!(snapshot.was_successful);
    assert!(snapshot.is_complete);
    assert_eq!(snapshot.total, 0);
    assert!(launched.lock().unwrap().is_empty());
}

#[tokio::test]
async fn invocation_is_recorded_on_the_task() {
    init_tracing();
    let launcher = ShellLauncher::new(["true"]);
    let mut runner = shell_runner(
        vec![Task::new("Gather", "Config/Game_Gather.ini", true)],
        launcher,
        static_env(),
    );

    let snapshot = with_timeout(runner.run_until_finished(pending())).await;

    assert_eq!(
        snapshot.tasks[0].invocation.as_deref(),
        Some("UE4Editor-Cmd -run=GatherText -config=\"Config/Game_Gather.ini\"")
    );
}
