//! Text summary builder for CLI output.
//!
//! Formats a [`ToggleOutcome`] as human-readable lines for `--verbose`.

use crate::model::{ActionStatus, ProcessAction, ToggleOutcome};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn build_text_summary(outcome: &ToggleOutcome) -> TextSummary {
    let mut lines = Vec::with_capacity(outcome.actions.len() + 1);

    if outcome.flag_changed {
        lines.push(format!(
            "Layout: {} -> {}",
            outcome.from.as_str(),
            outcome.to.as_str()
        ));
    } else {
        lines.push(format!("Layout: {} (unchanged)", outcome.to.as_str()));
    }

    for a in &outcome.actions {
        let verb = match a.action {
            ProcessAction::Terminate => "stop",
            ProcessAction::Start => "start",
        };
        let status = match &a.status {
            ActionStatus::Done => "ok".to_string(),
            ActionStatus::Skipped(why) => format!("skipped ({why})"),
            ActionStatus::Failed(err) => format!("failed: {err}"),
        };
        lines.push(format!("  {verb} {}: {status}", a.process));
    }

    TextSummary { lines }
}
