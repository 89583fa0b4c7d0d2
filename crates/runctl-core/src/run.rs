// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The run record: the unit of durable state this whole subsystem revolves
//! around.

use crate::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Which kind of runnable a run is executing. Both variants are opaque to
/// this crate: resolving `runnable_id` into an actual configuration is the
/// job of an external collaborator (see `runctl-worker::resolver`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnableKind {
    Agent,
    Team,
}

crate::simple_display! {
    RunnableKind {
        Agent => "agent",
        Team => "team",
    }
}

/// Status of a run. See [`RunStatus::can_transition_to`] for the legal
/// transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    RunStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl RunStatus {
    /// Whether this status is a terminal status: once reached, a run's
    /// status never changes again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// The legal transition graph: `pending -> running -> {completed,
    /// failed, cancelled}`, plus `pending -> {failed, cancelled}` directly.
    /// No transition is legal out of a terminal status.
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        use RunStatus::*;
        match (self, next) {
            (Pending, Running | Failed | Cancelled) => true,
            (Running, Completed | Failed | Cancelled) => true,
            _ => false,
        }
    }
}

/// A single run record.
///
/// Mutated only through compare-and-set `transition` calls at the store;
/// there is intentionally no public setter on this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub runnable_kind: RunnableKind,
    pub runnable_id: String,
    pub status: RunStatus,
    pub input_variables: HashMap<String, Value>,
    pub output_data: Option<Value>,
    pub error_message: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub worker_handle: Option<String>,
}

impl Run {
    /// Construct a brand new `pending` record. Only the store calls this;
    /// production code goes through `RunStore::insert_pending`.
    pub fn new_pending(
        id: RunId,
        runnable_kind: RunnableKind,
        runnable_id: String,
        input_variables: HashMap<String, Value>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            runnable_kind,
            runnable_id,
            status: RunStatus::Pending,
            input_variables,
            output_data: None,
            error_message: None,
            submitted_at: now,
            started_at: None,
            ended_at: None,
            worker_handle: None,
        }
    }
}

/// A patch applied atomically alongside a status transition at the store.
/// Only the fields relevant to the transition being performed are set; the
/// store never interprets a patch field without also checking the status
/// invariant it belongs to (e.g. `output_data` only lands on `completed`).
#[derive(Debug, Clone, Default)]
pub struct RunPatch {
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub worker_handle: Option<String>,
    pub output_data: Option<Value>,
    pub error_message: Option<String>,
}

impl RunPatch {
    crate::setters! {
        option { worker_handle: String, output_data: Value, error_message: String }
        set { started_at: Option<DateTime<Utc>>, ended_at: Option<DateTime<Utc>> }
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct RunBuilder => Run {
        set { id: RunId = RunId::new() }
        set { runnable_kind: RunnableKind = RunnableKind::Agent }
        into { runnable_id: String = "a1" }
        set { status: RunStatus = RunStatus::Pending }
        set { input_variables: HashMap<String, Value> = HashMap::new() }
        option { output_data: Value = None }
        option { error_message: String = None }
        computed { submitted_at: DateTime<Utc> = Utc::now() }
        option { started_at: DateTime<Utc> = None }
        option { ended_at: DateTime<Utc> = None }
        option { worker_handle: String = None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_go_running_failed_or_cancelled() {
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Running));
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Failed));
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Cancelled));
        assert!(!RunStatus::Pending.can_transition_to(RunStatus::Completed));
    }

    #[test]
    fn running_can_only_reach_terminal_statuses() {
        assert!(RunStatus::Running.can_transition_to(RunStatus::Completed));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Failed));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Cancelled));
        assert!(!RunStatus::Running.can_transition_to(RunStatus::Pending));
    }

    #[test]
    fn terminal_statuses_have_no_outgoing_transitions() {
        for terminal in [RunStatus::Completed, RunStatus::Failed, RunStatus::Cancelled] {
            for next in
                [RunStatus::Pending, RunStatus::Running, RunStatus::Completed, RunStatus::Failed, RunStatus::Cancelled]
            {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn new_pending_has_only_submission_timestamp() {
        let run = Run::new_pending(
            RunId::new(),
            RunnableKind::Agent,
            "a1".into(),
            HashMap::new(),
            Utc::now(),
        );
        assert_eq!(run.status, RunStatus::Pending);
        assert!(run.started_at.is_none());
        assert!(run.ended_at.is_none());
        assert!(run.worker_handle.is_none());
    }
}
