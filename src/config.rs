//! On-disk configuration.
//!
//! Optional JSON file at `<config dir>/panel-toggle/config.json`. Every field may be omitted;
//! a missing default file means "all defaults".

use crate::error::ToggleError;
use crate::model::{ControlMode, DuplicatePolicy, Matcher, ProcessSpec};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const FLAG_FILE_NAME: &str = ".panel-toggle-launcher";
const LOCK_FILE_NAME: &str = "panel-toggle.lock";
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub flag_file: Option<PathBuf>,
    pub lock: Option<bool>,
    pub lock_file: Option<PathBuf>,
    pub helper: Option<ProcessSpec>,
    pub panel: Option<ProcessSpec>,
    pub duplicates: Option<DuplicatePolicy>,
    pub control: Option<ControlMode>,
    #[serde(with = "humantime_serde")]
    pub confirm_timeout: Option<Duration>,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("panel-toggle").join("config.json"))
}

/// Load `explicit` if given (it must exist), otherwise the default path if present.
pub fn load(explicit: Option<&Path>) -> Result<FileConfig> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(FileConfig::default()),
        },
    };

    let text = match std::fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(FileConfig::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("read config {}", path.display()));
        }
    };
    parse(&path, &text).map_err(Into::into)
}

pub fn parse(path: &Path, text: &str) -> Result<FileConfig, ToggleError> {
    serde_json::from_str(text).map_err(|e| ToggleError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Expand a leading `~/` against `home`.
pub fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Default helper: the distribution's panel helper script, matched on its path.
pub fn default_helper() -> ProcessSpec {
    ProcessSpec {
        label: "helper".into(),
        program: "/usr/share/postx/panel-helper".into(),
        args: Vec::new(),
        matcher: Matcher::CommandLine("postx/panel-helper".into()),
    }
}

pub fn default_panel() -> ProcessSpec {
    ProcessSpec {
        label: "panel".into(),
        program: "tint2".into(),
        args: Vec::new(),
        matcher: Matcher::Name("tint2".into()),
    }
}

/// Lock file goes in the first per-user directory that exists, so the home directory only ever
/// holds the marker. Without any of them it sits next to the flag file.
pub fn default_lock_path(flag_file: &Path) -> PathBuf {
    pick_lock_path(
        [dirs::runtime_dir(), dirs::state_dir(), dirs::cache_dir()],
        flag_file,
    )
}

fn pick_lock_path(
    candidates: impl IntoIterator<Item = Option<PathBuf>>,
    flag_file: &Path,
) -> PathBuf {
    if let Some(dir) = candidates.into_iter().flatten().find(|dir| dir.is_dir()) {
        return dir.join(LOCK_FILE_NAME);
    }
    let mut name = flag_file
        .file_name()
        .unwrap_or(OsStr::new(FLAG_FILE_NAME))
        .to_os_string();
    name.push(".lock");
    flag_file.with_file_name(name)
}
