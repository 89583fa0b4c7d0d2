// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure state-transition application, shared by the in-memory fake and the
//! WAL-backed store so the CAS semantics can't drift between them.

use runctl_core::{Run, RunPatch, RunStatus};

/// Apply `patch` to `run` in place, given that the caller has already
/// verified `run.status == expected` and `expected.can_transition_to(next)`.
pub(crate) fn apply(run: &mut Run, next: RunStatus, patch: RunPatch) {
    run.status = next;
    if let Some(started_at) = patch.started_at {
        run.started_at = Some(started_at);
    }
    if let Some(ended_at) = patch.ended_at {
        run.ended_at = Some(ended_at);
    }
    if let Some(handle) = patch.worker_handle {
        run.worker_handle = Some(handle);
    }
    if next == RunStatus::Completed {
        if let Some(output) = patch.output_data {
            run.output_data = Some(output);
        }
    }
    if matches!(next, RunStatus::Failed | RunStatus::Cancelled) {
        if let Some(message) = patch.error_message {
            run.error_message = Some(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runctl_core::RunBuilder;

    #[test]
    fn output_data_only_lands_on_completed() {
        let mut run = RunBuilder::default().status(RunStatus::Running).build();
        let patch = RunPatch::default().output_data(serde_json::json!("x"));
        apply(&mut run, RunStatus::Failed, patch);
        assert!(run.output_data.is_none());
    }

    #[test]
    fn error_message_only_lands_on_failure_terminals() {
        let mut run = RunBuilder::default().status(RunStatus::Running).build();
        let patch = RunPatch::default().error_message("boom");
        apply(&mut run, RunStatus::Completed, patch);
        assert!(run.error_message.is_none());
    }
}
