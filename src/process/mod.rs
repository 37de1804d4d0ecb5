//! Lifecycle control for the two managed programs.
//!
//! [`SignalController`] fires requests and returns; [`ConfirmingController`] waits for the
//! process table to agree. Both honour the configured [`DuplicatePolicy`] on start.

mod confirm;
mod proc_table;
mod signal;

pub(crate) use confirm::ConfirmingController;
pub(crate) use proc_table::ProcTable;
pub(crate) use signal::SignalController;

use crate::error::ProcessControlError;
use crate::model::{DuplicatePolicy, ProcessSpec};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::os::unix::process::CommandExt as _;
use std::process::Stdio;

/// What a controller actually did for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Effect {
    Signalled(usize),
    NotRunning,
    Spawned(Option<u32>),
    AlreadyRunning,
}

pub(crate) trait ProcessController {
    /// Ask every process matching `spec` to exit.
    async fn terminate(&self, spec: &ProcessSpec) -> Result<Effect, ProcessControlError>;
    /// Launch `spec` in the background.
    async fn start(&self, spec: &ProcessSpec) -> Result<Effect, ProcessControlError>;
}

/// Send SIGTERM to every match. Processes that vanish before the signal lands are ignored.
fn signal_matching(table: &ProcTable, spec: &ProcessSpec) -> Result<Effect, ProcessControlError> {
    let pids = table.find(&spec.matcher).map_err(ProcessControlError::Scan)?;
    if pids.is_empty() {
        return Ok(Effect::NotRunning);
    }

    let mut signalled = 0;
    let mut first_err = None;
    for pid in pids {
        match kill(Pid::from_raw(pid), Signal::SIGTERM) {
            Ok(()) => {
                tracing::debug!(process = %spec.label, pid, "sent SIGTERM");
                signalled += 1;
            }
            Err(Errno::ESRCH) => {
                tracing::debug!(process = %spec.label, pid, "exited before signal");
            }
            Err(source) => {
                tracing::debug!(process = %spec.label, pid, %source, "signal failed");
                if first_err.is_none() {
                    first_err = Some(ProcessControlError::Signal { pid, source });
                }
            }
        }
    }

    match first_err {
        Some(e) if signalled == 0 => Err(e),
        _ => Ok(Effect::Signalled(signalled)),
    }
}

/// `Some(AlreadyRunning)` when the duplicate policy says this start should be skipped.
fn skip_duplicate(
    table: &ProcTable,
    policy: DuplicatePolicy,
    spec: &ProcessSpec,
) -> Result<Option<Effect>, ProcessControlError> {
    match policy {
        DuplicatePolicy::Allow => Ok(None),
        DuplicatePolicy::Skip => {
            let running = table.find(&spec.matcher).map_err(ProcessControlError::Scan)?;
            if running.is_empty() {
                Ok(None)
            } else {
                tracing::debug!(process = %spec.label, ?running, "already running, not spawning");
                Ok(Some(Effect::AlreadyRunning))
            }
        }
    }
}

/// Spawn in a new process group with stdio detached so the child outlives this invocation.
fn spawn_detached(spec: &ProcessSpec) -> Result<tokio::process::Child, ProcessControlError> {
    let mut cmd = std::process::Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0);
    let child = tokio::process::Command::from(cmd)
        .spawn()
        .map_err(|source| ProcessControlError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
    tracing::debug!(process = %spec.label, pid = ?child.id(), "spawned");
    Ok(child)
}
