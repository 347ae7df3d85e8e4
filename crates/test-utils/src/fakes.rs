use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use locimport::env::{EnvironmentAdapter, SourceControlSettings};
use locimport::errors::{LocimportError, Result};
use locimport::exec::{Invocation, ProcessLauncher};
use tokio::process::Command;

/// Script that makes [`ShellLauncher`] hand out a command that cannot spawn.
pub const UNLAUNCHABLE: &str = "<unlaunchable>";

/// Shared, ordered record of what the launcher and environment were asked
/// to do. Entries look like `"launch 0"`, `"swap"`, `"restore"`.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// A launcher that:
/// - runs the next shell snippet from its list (`sh -c`) for each launch,
///   in launch order, instead of the editor binary
/// - records every invocation it was asked for.
pub struct ShellLauncher {
    scripts: VecDeque<String>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
    journal: Journal,
}

impl ShellLauncher {
    pub fn new<I, S>(scripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scripts: scripts.into_iter().map(Into::into).collect(),
            invocations: Arc::new(Mutex::new(Vec::new())),
            journal: Journal::new(),
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    /// Handle to the recorded invocations; stays valid after the launcher
    /// moves into a runner.
    pub fn invocations(&self) -> Arc<Mutex<Vec<Invocation>>> {
        Arc::clone(&self.invocations)
    }
}

impl ProcessLauncher for ShellLauncher {
    fn command(&mut self, invocation: &Invocation) -> Command {
        let launch_no = {
            let mut guard = self.invocations.lock().unwrap();
            guard.push(invocation.clone());
            guard.len() - 1
        };
        self.journal.push(format!("launch {launch_no}"));

        match self.scripts.pop_front() {
            Some(script) if script != UNLAUNCHABLE => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(script);
                cmd
            }
            _ => Command::new("/nonexistent/locimport-test-editor"),
        }
    }
}

/// Environment adapter that journals swap/restore calls and can be told to
/// fail them.
#[derive(Debug, Clone, Default)]
pub struct RecordingEnvironment {
    pub settings: SourceControlSettings,
    pub fail_swap: bool,
    pub fail_restore: bool,
    journal: Journal,
}

impl RecordingEnvironment {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }
}

impl EnvironmentAdapter for RecordingEnvironment {
    fn source_control(&self) -> SourceControlSettings {
        self.settings
    }

    fn swap_in_project_settings(&mut self) -> Result<()> {
        self.journal.push("swap");
        if self.fail_swap {
            return Err(LocimportError::EnvironmentError("swap refused".to_string()));
        }
        Ok(())
    }

    fn restore_global_settings(&mut self) -> Result<()> {
        self.journal.push("restore");
        if self.fail_restore {
            return Err(LocimportError::EnvironmentError("restore refused".to_string()));
        }
        Ok(())
    }
}
