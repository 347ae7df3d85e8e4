// src/plan/bridge.rs

//! Hand-off to the translation update script.
//!
//! The scripted update step runs inside its own commandlet process, so the
//! user's selection is written to a parameter file that the script reads on
//! start-up.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::SelectionSection;
use crate::errors::{LocimportError, Result};
use crate::fs::FileSystem;

/// Which spreadsheet pages and languages the update script should apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationSelection {
    pub spreadsheet: PathBuf,
    pub pages: Vec<String>,
    pub languages: Vec<String>,
    pub case_sensitive: bool,
    pub force_refresh: bool,
}

impl TranslationSelection {
    pub fn from_section(section: &SelectionSection) -> Result<Self> {
        let spreadsheet = section.spreadsheet.clone().ok_or_else(|| {
            LocimportError::ConfigError("[selection].spreadsheet is required".to_string())
        })?;
        Ok(Self {
            spreadsheet,
            pages: section.pages.clone(),
            languages: section.languages.clone(),
            case_sensitive: section.case_sensitive,
            force_refresh: section.force_refresh,
        })
    }

    /// Parameter file contents, one value per line:
    /// spreadsheet path, case flag, refresh flag, `"<pages> <languages>"`,
    /// then the page names, then the language names.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.spreadsheet.to_string_lossy());
        out.push('\n');
        out.push_str(python_bool(self.case_sensitive));
        out.push('\n');
        out.push_str(python_bool(self.force_refresh));
        out.push('\n');
        out.push_str(&format!("{} {}\n", self.pages.len(), self.languages.len()));
        for line in self.pages.iter().chain(&self.languages) {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

fn python_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Injected capability for the scripted update step.
pub trait ScriptBridge {
    /// Persist `selection` where the update script will read it.
    fn prepare(&self, selection: &TranslationSelection) -> Result<()>;

    /// Literal script body for the update task.
    fn update_script(&self) -> String;
}

/// Bridge for the Python `update_translations` script.
#[derive(Debug, Clone)]
pub struct PythonScriptBridge<F: FileSystem> {
    fs: F,
    script_dir: PathBuf,
}

impl<F: FileSystem> PythonScriptBridge<F> {
    pub fn new(fs: F, script_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            script_dir: script_dir.into(),
        }
    }

    /// `<script_dir>/Temp/update.txt`
    pub fn selection_file(&self) -> PathBuf {
        self.script_dir.join("Temp").join("update.txt")
    }

    pub fn script_dir(&self) -> &Path {
        &self.script_dir
    }
}

impl<F: FileSystem> ScriptBridge for PythonScriptBridge<F> {
    fn prepare(&self, selection: &TranslationSelection) -> Result<()> {
        let path = self.selection_file();
        self.fs.write(&path, selection.render().as_bytes())?;
        info!(
            path = ?path,
            pages = selection.pages.len(),
            languages = selection.languages.len(),
            "translation selection written"
        );
        Ok(())
    }

    fn update_script(&self) -> String {
        // `\n` stays escaped; the commandlet expands it.
        let dir = self.script_dir.to_string_lossy().replace('\\', "/");
        format!(
            "import os\\nimport sys\\nsys.path.append('{dir}')\\nfrom update_translations import *\\nupdate()"
        )
    }
}
