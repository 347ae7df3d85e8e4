// src/env/mod.rs

//! Environment adapter: source-control settings seen by commandlets.
//!
//! Commandlets launched without the project file read the engine-wide source
//! control settings file. Before such a task starts, the engine file is backed
//! up and replaced with the project's settings; after the process exits the
//! backup is moved back. The runner treats every failure here as non-fatal.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::SourceControlSection;
use crate::errors::{LocimportError, Result};
use crate::fs::FileSystem;

/// Source-control flags that shape commandlet arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceControlSettings {
    pub enabled: bool,
    pub auto_submit: bool,
}

impl From<&SourceControlSection> for SourceControlSettings {
    fn from(section: &SourceControlSection) -> Self {
        Self {
            enabled: section.enabled,
            auto_submit: section.auto_submit,
        }
    }
}

/// Narrow interface the queue runner uses for everything outside the
/// processes themselves.
pub trait EnvironmentAdapter: Send {
    /// Source-control configuration at call time.
    fn source_control(&self) -> SourceControlSettings;

    /// Back up the global settings file and copy the project-scoped one over
    /// it.
    fn swap_in_project_settings(&mut self) -> Result<()>;

    /// Move the backup back over the global settings file.
    fn restore_global_settings(&mut self) -> Result<()>;
}

impl<T: EnvironmentAdapter + ?Sized> EnvironmentAdapter for Box<T> {
    fn source_control(&self) -> SourceControlSettings {
        (**self).source_control()
    }

    fn swap_in_project_settings(&mut self) -> Result<()> {
        (**self).swap_in_project_settings()
    }

    fn restore_global_settings(&mut self) -> Result<()> {
        (**self).restore_global_settings()
    }
}

/// Adapter with fixed source-control flags and no file side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticEnvironment {
    settings: SourceControlSettings,
}

impl StaticEnvironment {
    pub fn new(settings: SourceControlSettings) -> Self {
        Self { settings }
    }
}

impl EnvironmentAdapter for StaticEnvironment {
    fn source_control(&self) -> SourceControlSettings {
        self.settings
    }

    fn swap_in_project_settings(&mut self) -> Result<()> {
        Ok(())
    }

    fn restore_global_settings(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Adapter that swaps real settings files through a [`FileSystem`].
#[derive(Debug)]
pub struct SourceControlEnvironment<F: FileSystem> {
    fs: F,
    settings: SourceControlSettings,
    global_settings: PathBuf,
    project_settings: PathBuf,
    backup: PathBuf,
}

impl<F: FileSystem> SourceControlEnvironment<F> {
    pub fn new(
        fs: F,
        settings: SourceControlSettings,
        global_settings: impl Into<PathBuf>,
        project_settings: impl Into<PathBuf>,
        backup_dir: impl AsRef<Path>,
    ) -> Self {
        let global_settings = global_settings.into();
        let backup = backup_path(&global_settings, backup_dir.as_ref());
        Self {
            fs,
            settings,
            global_settings,
            project_settings: project_settings.into(),
            backup,
        }
    }

    /// Build from `[source_control]`. Fails if a path is missing.
    pub fn from_section(fs: F, section: &SourceControlSection) -> Result<Self> {
        let missing = |key: &str| {
            LocimportError::ConfigError(format!("[source_control].{key} is required"))
        };
        let global = section
            .global_settings
            .clone()
            .ok_or_else(|| missing("global_settings"))?;
        let project = section
            .project_settings
            .clone()
            .ok_or_else(|| missing("project_settings"))?;
        let backup_dir = section
            .backup_dir
            .clone()
            .ok_or_else(|| missing("backup_dir"))?;
        Ok(Self::new(fs, section.into(), global, project, backup_dir))
    }

    /// Location of the `.bak` copy.
    pub fn backup_file(&self) -> &Path {
        &self.backup
    }
}

/// `<backup_dir>/<global file name>.bak`
fn backup_path(global_settings: &Path, backup_dir: &Path) -> PathBuf {
    let mut name = global_settings
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "SourceControlSettings.ini".into());
    name.push(".bak");
    backup_dir.join(name)
}

impl<F: FileSystem> EnvironmentAdapter for SourceControlEnvironment<F> {
    fn source_control(&self) -> SourceControlSettings {
        self.settings
    }

    fn swap_in_project_settings(&mut self) -> Result<()> {
        self.fs.copy(&self.global_settings, &self.backup).map_err(|e| {
            LocimportError::EnvironmentError(format!(
                "failed to back up source control settings: {e:#}"
            ))
        })?;
        debug!(backup = ?self.backup, "backed up global source control settings");

        self.fs
            .copy(&self.project_settings, &self.global_settings)
            .map_err(|e| {
                LocimportError::EnvironmentError(format!(
                    "failed to overwrite global source control settings: {e:#}"
                ))
            })?;
        info!(
            global = ?self.global_settings,
            project = ?self.project_settings,
            "project source control settings swapped in"
        );
        Ok(())
    }

    fn restore_global_settings(&mut self) -> Result<()> {
        self.fs
            .rename(&self.backup, &self.global_settings)
            .map_err(|e| {
                LocimportError::EnvironmentError(format!(
                    "failed to restore global source control settings: {e:#}"
                ))
            })?;
        info!(global = ?self.global_settings, "global source control settings restored");
        Ok(())
    }
}
