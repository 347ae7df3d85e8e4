// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Default substring that marks a task's `script_path` as a literal script
/// body rather than a commandlet config file.
pub const DEFAULT_SCRIPT_MARKER: &str = "update_translations";

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [editor]
/// executable = "/opt/UnrealEngine/Engine/Binaries/Linux/UE4Editor-Cmd"
/// project = "/work/Game/Game.uproject"
///
/// [source_control]
/// enabled = true
/// auto_submit = false
///
/// [pipeline]
/// target = "Game"
/// config_dir = "/work/Game/Config/Localization"
/// script_dir = "/work/Game/Plugins/LocalizationImporter/Content/Python"
///
/// [selection]
/// spreadsheet = "/work/translations.xlsx"
/// pages = ["Menus"]
/// languages = ["French", "German"]
/// ```
///
/// Either `[pipeline]` or one or more `[[task]]` entries must be present.
/// This is the unchecked shape; use [`ConfigFile`] after validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub editor: EditorSection,

    #[serde(default)]
    pub runner: RunnerSection,

    #[serde(default)]
    pub source_control: SourceControlSection,

    #[serde(default)]
    pub pipeline: Option<PipelineSection>,

    #[serde(default)]
    pub selection: SelectionSection,

    /// Explicit task list; overrides the fixed pipeline plan when non-empty.
    #[serde(default)]
    pub task: Vec<TaskConfig>,
}

/// Validated configuration. Only constructible through
/// `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub editor: EditorSection,
    pub runner: RunnerSection,
    pub source_control: SourceControlSection,
    pub pipeline: Option<PipelineSection>,
    pub selection: SelectionSection,
    pub task: Vec<TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            editor: raw.editor,
            runner: raw.runner,
            source_control: raw.source_control,
            pipeline: raw.pipeline,
            selection: raw.selection,
            task: raw.task,
        }
    }

    /// True when at least one configured task runs without the project file
    /// and therefore needs the source-control settings swap.
    pub fn needs_settings_swap(&self) -> bool {
        needs_settings_swap(self.pipeline.as_ref(), &self.task)
    }
}

impl RawConfigFile {
    pub fn needs_settings_swap(&self) -> bool {
        needs_settings_swap(self.pipeline.as_ref(), &self.task)
    }
}

fn needs_settings_swap(pipeline: Option<&PipelineSection>, tasks: &[TaskConfig]) -> bool {
    match pipeline {
        Some(p) if tasks.is_empty() => !p.use_project_file,
        _ => tasks.iter().any(|t| !t.use_project_file),
    }
}

/// `[editor]` section: the commandlet host binary.
#[derive(Debug, Clone, Deserialize)]
pub struct EditorSection {
    /// Executable used to run commandlets (e.g. `UE4Editor-Cmd`).
    pub executable: PathBuf,

    /// Project file passed to tasks that run with full project context.
    #[serde(default)]
    pub project: Option<PathBuf>,

    /// Extra arguments appended to every commandlet invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// How often the completion poller runs.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long to wait for the log pump to drain after the process exited.
    #[serde(default = "default_drain_grace_ms")]
    pub drain_grace_ms: u64,

    /// Substring identifying literal script tasks.
    #[serde(default = "default_script_marker")]
    pub script_marker: String,
}

fn default_poll_interval_ms() -> u64 {
    100
}

/// Lower bound for `[runner].drain_grace_ms`. Below it the pump could be
/// abandoned before it has read output already sitting in the pipe.
pub const MIN_DRAIN_GRACE_MS: u64 = 100;

fn default_drain_grace_ms() -> u64 {
    2_000
}

fn default_script_marker() -> String {
    DEFAULT_SCRIPT_MARKER.to_string()
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            drain_grace_ms: default_drain_grace_ms(),
            script_marker: default_script_marker(),
        }
    }
}

/// `[source_control]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SourceControlSection {
    /// Adds `-EnableSCC` to every invocation.
    #[serde(default)]
    pub enabled: bool,

    /// When false (and `enabled`), adds `-DisableSCCSubmit`.
    #[serde(default)]
    pub auto_submit: bool,

    /// Engine-wide source control settings file.
    #[serde(default)]
    pub global_settings: Option<PathBuf>,

    /// Project-scoped settings copied over the global file for tasks that run
    /// without the project file.
    #[serde(default)]
    pub project_settings: Option<PathBuf>,

    /// Where the `.bak` copy of the global file is kept.
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,
}

/// `[pipeline]` section: parameters of the fixed
/// gather → export → update → import → report → compile plan.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// Localization target name, e.g. `"Game"`.
    pub target: String,

    /// Directory holding `<target>_Gather.ini` and friends.
    pub config_dir: PathBuf,

    /// Directory with `update_translations.py`.
    pub script_dir: PathBuf,

    #[serde(default = "default_true")]
    pub use_project_file: bool,
}

fn default_true() -> bool {
    true
}

/// `[selection]` section: which spreadsheet pages and languages the update
/// script should apply.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SelectionSection {
    #[serde(default)]
    pub spreadsheet: Option<PathBuf>,

    #[serde(default)]
    pub pages: Vec<String>,

    #[serde(default)]
    pub languages: Vec<String>,

    #[serde(default)]
    pub case_sensitive: bool,

    /// Overwrite translations that already exist.
    #[serde(default)]
    pub force_refresh: bool,
}

/// `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Display name.
    pub name: String,

    /// Commandlet config path, or a literal script body when it contains the
    /// script marker.
    pub script_path: String,

    #[serde(default = "default_true")]
    pub use_project_file: bool,
}
