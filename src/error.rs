//! Error taxonomy for the toggle.
//!
//! `ToggleError` aborts an invocation. `ProcessControlError` never does: it is logged and
//! recorded in the outcome, and the flag change that preceded it stands.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ToggleError {
    #[error("cannot {op} flag file {}", path.display())]
    FileAccess {
        op: FileOp,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot lock {}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Check,
    Create,
    Remove,
}

impl std::fmt::Display for FileOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FileOp::Check => "check",
            FileOp::Create => "create",
            FileOp::Remove => "remove",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessControlError {
    #[error("cannot read process table: {0}")]
    Scan(#[source] procfs::ProcError),

    #[error("cannot signal pid {pid}: {source}")]
    Signal {
        pid: i32,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("cannot spawn {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exited with {status}", program.display())]
    Exited {
        program: PathBuf,
        status: std::process::ExitStatus,
    },

    #[error("{label} still {state} after {waited:?}")]
    NotConfirmed {
        label: String,
        state: &'static str,
        waited: std::time::Duration,
    },
}
