use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Resolved settings for a single invocation (config file merged with CLI overrides).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub flag_file: PathBuf,
    pub lock_file: Option<PathBuf>,
    pub helper: ProcessSpec,
    pub panel: ProcessSpec,
    pub duplicates: DuplicatePolicy,
    pub control: ControlMode,
    pub confirm_timeout: Duration,
}

/// The two desktop layouts. The flag file exists exactly when the launcher layout is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToggleState {
    PanelFocused,
    LauncherFocused,
}

impl ToggleState {
    pub fn from_flag(flag_set: bool) -> Self {
        if flag_set {
            ToggleState::LauncherFocused
        } else {
            ToggleState::PanelFocused
        }
    }

    pub fn flag_set(self) -> bool {
        matches!(self, ToggleState::LauncherFocused)
    }

    pub fn flipped(self) -> Self {
        match self {
            ToggleState::PanelFocused => ToggleState::LauncherFocused,
            ToggleState::LauncherFocused => ToggleState::PanelFocused,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ToggleState::PanelFocused => "panel-focused",
            ToggleState::LauncherFocused => "launcher-focused",
        }
    }
}

/// How a managed process is recognised in the process table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "by", content = "pattern")]
pub enum Matcher {
    /// Exact process name, like `killall`.
    Name(String),
    /// Substring of the full command line, like `pkill -f`.
    CommandLine(String),
}

/// One of the two external programs the toggle starts and stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub label: String,
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    pub matcher: Matcher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Always spawn, even if a matching instance is already running.
    #[default]
    Allow,
    /// Leave an already running instance alone.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Signal or spawn and return immediately.
    #[default]
    BestEffort,
    /// Wait until the process table reflects the request.
    Confirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessAction {
    Terminate,
    Start,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum ActionStatus {
    Done,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    pub process: String,
    pub action: ProcessAction,
    pub status: ActionStatus,
}

/// What one invocation observed and did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOutcome {
    pub from: ToggleState,
    pub to: ToggleState,
    pub flag_changed: bool,
    pub actions: Vec<ActionReport>,
}

impl ToggleOutcome {
    pub fn failed_actions(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a.status, ActionStatus::Failed(_)))
            .count()
    }
}
