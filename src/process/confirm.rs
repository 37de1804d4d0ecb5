use super::{signal_matching, skip_duplicate, spawn_detached, Effect, ProcTable, ProcessController};
use crate::error::ProcessControlError;
use crate::model::{DuplicatePolicy, ProcessSpec};
use std::time::Duration;
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Control that waits until the process table reflects each request, up to `timeout`.
#[derive(Debug, Clone)]
pub(crate) struct ConfirmingController {
    table: ProcTable,
    duplicates: DuplicatePolicy,
    timeout: Duration,
}

impl ConfirmingController {
    pub(crate) fn new(table: ProcTable, duplicates: DuplicatePolicy, timeout: Duration) -> Self {
        Self {
            table,
            duplicates,
            timeout,
        }
    }

    fn matching(&self, spec: &ProcessSpec) -> Result<Vec<i32>, ProcessControlError> {
        self.table
            .find(&spec.matcher)
            .map_err(ProcessControlError::Scan)
    }

    fn running(&self, spec: &ProcessSpec) -> Result<bool, ProcessControlError> {
        self.matching(spec).map(|pids| !pids.is_empty())
    }

    fn not_confirmed(&self, spec: &ProcessSpec, state: &'static str) -> ProcessControlError {
        ProcessControlError::NotConfirmed {
            label: spec.label.clone(),
            state,
            waited: self.timeout,
        }
    }
}

impl ProcessController for ConfirmingController {
    async fn terminate(&self, spec: &ProcessSpec) -> Result<Effect, ProcessControlError> {
        let effect = signal_matching(&self.table, spec)?;
        if effect == Effect::NotRunning {
            return Ok(effect);
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            if !self.running(spec)? {
                return Ok(effect);
            }
            if Instant::now() >= deadline {
                return Err(self.not_confirmed(spec, "running"));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn start(&self, spec: &ProcessSpec) -> Result<Effect, ProcessControlError> {
        if let Some(skipped) = skip_duplicate(&self.table, self.duplicates, spec)? {
            return Ok(skipped);
        }
        // Instances already running before the spawn must not count as confirmation.
        let before = self.matching(spec)?;
        let mut child = spawn_detached(spec)?;
        let pid = child.id();

        let deadline = Instant::now() + self.timeout;
        loop {
            // A clean exit is fine: daemonising programs fork and leave.
            failed_exit(&mut child, spec)?;
            let appeared = self.matching(spec)?.iter().any(|p| !before.contains(p));
            if appeared {
                // The match may belong to someone else while our child just died.
                failed_exit(&mut child, spec)?;
                return Ok(Effect::Spawned(pid));
            }
            if Instant::now() >= deadline {
                failed_exit(&mut child, spec)?;
                return Err(self.not_confirmed(spec, "not running"));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

fn failed_exit(
    child: &mut tokio::process::Child,
    spec: &ProcessSpec,
) -> Result<(), ProcessControlError> {
    match child.try_wait() {
        Ok(Some(status)) if !status.success() => Err(ProcessControlError::Exited {
            program: spec.program.clone(),
            status,
        }),
        _ => Ok(()),
    }
}
