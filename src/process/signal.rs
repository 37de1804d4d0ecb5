use super::{signal_matching, skip_duplicate, spawn_detached, Effect, ProcTable, ProcessController};
use crate::error::ProcessControlError;
use crate::model::{DuplicatePolicy, ProcessSpec};

/// Fire-and-forget control: signal or spawn, then return without checking the result.
#[derive(Debug, Clone, Default)]
pub(crate) struct SignalController {
    table: ProcTable,
    duplicates: DuplicatePolicy,
}

impl SignalController {
    pub(crate) fn new(table: ProcTable, duplicates: DuplicatePolicy) -> Self {
        Self { table, duplicates }
    }
}

impl ProcessController for SignalController {
    async fn terminate(&self, spec: &ProcessSpec) -> Result<Effect, ProcessControlError> {
        signal_matching(&self.table, spec)
    }

    async fn start(&self, spec: &ProcessSpec) -> Result<Effect, ProcessControlError> {
        if let Some(skipped) = skip_duplicate(&self.table, self.duplicates, spec)? {
            return Ok(skipped);
        }
        let child = spawn_detached(spec)?;
        Ok(Effect::Spawned(child.id()))
    }
}
