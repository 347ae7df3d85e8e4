// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod env;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod plan;
pub mod queue;
pub mod report;
pub mod types;

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_and_validate};
use crate::config::model::ConfigFile;
use crate::engine::{QueueEvent, QueueRunner, RunnerOptions};
use crate::env::{
    EnvironmentAdapter, SourceControlEnvironment, SourceControlSettings, StaticEnvironment,
};
use crate::exec::{CommandletLauncher, InvocationBuilder};
use crate::fs::RealFileSystem;
use crate::plan::{PythonScriptBridge, ScriptBridge, TranslationSelection};
use crate::queue::Task;
use crate::types::{QueueState, TaskState};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the task plan
/// - the selection file for the update script
/// - the source-control environment
/// - the queue runner and its output printer
/// - Ctrl-C handling
///
/// Returns the state the queue ended in (`Idle` for `--dry-run`).
pub async fn run(args: CliArgs) -> Result<QueueState> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut cfg = load_and_validate(&config_path)?;

    if let Some(ms) = args.poll_interval_ms {
        if ms == 0 {
            bail!("--poll-interval-ms must be >= 1");
        }
        cfg.runner.poll_interval_ms = ms;
    }

    let script_dir = cfg
        .pipeline
        .as_ref()
        .map(|p| p.script_dir.clone())
        .unwrap_or_default();
    let bridge = PythonScriptBridge::new(RealFileSystem, script_dir);
    let tasks = plan::tasks_from_config(&cfg, &bridge);
    let invocations = InvocationBuilder::from_config(&cfg);
    let scc = SourceControlSettings::from(&cfg.source_control);

    if args.dry_run {
        print_dry_run(&cfg, &tasks, &invocations, scc);
        return Ok(QueueState::Idle);
    }

    if plan::uses_pipeline(&cfg) {
        let selection = TranslationSelection::from_section(&cfg.selection)?;
        bridge.prepare(&selection)?;
    }

    let env: Box<dyn EnvironmentAdapter> = if cfg.needs_settings_swap() {
        Box::new(SourceControlEnvironment::from_section(
            RealFileSystem,
            &cfg.source_control,
        )?)
    } else {
        Box::new(StaticEnvironment::new(scc))
    };

    let mut runner = QueueRunner::new(
        tasks,
        CommandletLauncher,
        env,
        invocations,
        RunnerOptions::from(&cfg.runner),
    );
    let printer = tokio::spawn(print_events(runner.subscribe()));

    info!(config = ?config_path, total = runner.sequencer().total(), "running task queue");
    let snapshot = runner.run_until_finished(shutdown_signal()).await;

    // Closes the event channel so the printer can finish.
    drop(runner);
    if let Err(e) = printer.await {
        warn!(error = %e, "output printer task failed");
    }

    eprint!("{}", report::render_summary(&snapshot));

    if let Some(path) = &args.save_log {
        report::save_logs(&RealFileSystem, Path::new(path), &snapshot)?;
    }

    Ok(snapshot.state)
}

/// Resolves on Ctrl-C. Never resolves if the handler can't be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Stream task output to stdout as it is captured.
async fn print_events(mut events: mpsc::UnboundedReceiver<QueueEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            QueueEvent::TaskStarted {
                index,
                name,
                invocation,
            } => {
                info!(task = %name, index, "task started");
                println!("==> {name}");
                println!("$ {invocation}");
            }
            QueueEvent::LogAppended { text, .. } => {
                let mut stdout = std::io::stdout().lock();
                let _ = stdout.write_all(text.as_bytes());
                let _ = stdout.flush();
            }
            QueueEvent::TaskFinished {
                index,
                name,
                state,
                exit_code,
            } => match state {
                TaskState::Succeeded => info!(task = %name, index, "task succeeded"),
                _ => warn!(task = %name, index, ?exit_code, %state, "task did not succeed"),
            },
            QueueEvent::QueueFinished { state, successful } => {
                debug!(%state, successful, "queue finished event");
            }
        }
    }
}

/// Print tasks and their resolved command lines without launching anything.
fn print_dry_run(
    cfg: &ConfigFile,
    tasks: &[Task],
    invocations: &InvocationBuilder,
    scc: SourceControlSettings,
) {
    println!("locimport dry-run");
    println!("  editor.executable = {}", cfg.editor.executable.display());
    if let Some(project) = &cfg.editor.project {
        println!("  editor.project = {}", project.display());
    }
    println!(
        "  source_control.enabled = {} (auto_submit = {})",
        scc.enabled, scc.auto_submit
    );
    println!("  runner.poll_interval_ms = {}", cfg.runner.poll_interval_ms);
    println!();

    println!("tasks ({}):", tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        let invocation = invocations.build(task, scc);
        println!("  {}. {}", i + 1, task.name);
        println!("      kind: {:?}", invocation.kind);
        println!("      use_project_file: {}", task.use_project_file);
        println!("      cmd: {}", invocation.command_line());
    }

    if cfg.needs_settings_swap() {
        println!();
        println!("source control settings are swapped for tasks without the project file");
    }

    debug!("dry-run complete (no execution)");
}
