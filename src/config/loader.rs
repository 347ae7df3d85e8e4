// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Read and deserialize a config file. No semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    Ok(toml::from_str(&contents)?)
}

/// Load, validate, and anchor relative paths at the config file's directory.
///
/// Anchored: `[editor].project`, the `[pipeline]` directories,
/// `[selection].spreadsheet` and every `[source_control]` path. The editor
/// executable and task `script_path`s are left alone since the former may be
/// looked up on `PATH` and the latter may be a script body.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let mut config = ConfigFile::try_from(load_from_path(path)?)?;

    if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        anchor_paths(&mut config, base);
    }
    Ok(config)
}

fn anchor_paths(config: &mut ConfigFile, base: &Path) {
    let anchor = |p: &mut PathBuf| {
        if !is_rooted(p) {
            *p = base.join(&*p);
        }
    };

    if let Some(project) = config.editor.project.as_mut() {
        anchor(project);
    }
    if let Some(pipeline) = config.pipeline.as_mut() {
        anchor(&mut pipeline.config_dir);
        anchor(&mut pipeline.script_dir);
    }
    if let Some(spreadsheet) = config.selection.spreadsheet.as_mut() {
        anchor(spreadsheet);
    }

    let scc = &mut config.source_control;
    for p in [&mut scc.global_settings, &mut scc.project_settings, &mut scc.backup_dir]
        .into_iter()
        .flatten()
    {
        anchor(p);
    }
}

/// Absolute on this host, or a `X:/` / `X:\` drive path written for Windows.
fn is_rooted(p: &Path) -> bool {
    if p.has_root() {
        return true;
    }
    let s = p.to_string_lossy();
    let b = s.as_bytes();
    b.len() >= 3 && b[0].is_ascii_alphabetic() && b[1] == b':' && (b[2] == b'/' || b[2] == b'\\')
}

/// Default config path: `Locimport.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Locimport.toml")
}
