// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::backoff::Backoff;
use crate::{CoordinatorConfig, CoordinatorError};
use runctl_core::{Clock, RunId, RunPatch, RunStatus, RunnableKind, SystemClock};
use runctl_scheduler::{ClusterSchedulerAdapter, SchedulerError, WorkerSpec};
use runctl_store::RunStore;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Accepts start/cancel requests and performs orphan reaping.
///
/// Generic over the store and scheduler so tests run against the
/// in-memory/fake implementations while production wires in the
/// WAL-backed store and the Kubernetes adapter.
pub struct Coordinator<St, Sc, C = SystemClock>
where
    St: RunStore,
    Sc: ClusterSchedulerAdapter,
    C: Clock,
{
    store: Arc<St>,
    scheduler: Arc<Sc>,
    clock: C,
    config: CoordinatorConfig,
}

impl<St, Sc, C> Coordinator<St, Sc, C>
where
    St: RunStore,
    Sc: ClusterSchedulerAdapter,
    C: Clock,
{
    pub fn new(store: Arc<St>, scheduler: Arc<Sc>, clock: C, config: CoordinatorConfig) -> Self {
        Self { store, scheduler, clock, config }
    }

    /// Insert a `pending` record, launch its worker (idempotently, with
    /// bounded retry), and transition to `running`. Returns the id
    /// immediately; does not wait for the worker to finish.
    pub async fn start(
        &self,
        runnable_kind: RunnableKind,
        runnable_id: String,
        input_variables: HashMap<String, Value>,
    ) -> Result<RunId, CoordinatorError> {
        let id = self
            .store
            .insert_pending(runnable_kind, runnable_id.clone(), input_variables.clone())
            .await?;

        let spec = WorkerSpec {
            run_id: id,
            runnable_kind,
            runnable_id,
            input_variables,
            image: self.config.worker_image.clone(),
            env: vec![],
            cpu_request: self.config.cpu_request.clone(),
            memory_request: self.config.memory_request.clone(),
            cpu_limit: self.config.cpu_limit.clone(),
            memory_limit: self.config.memory_limit.clone(),
        };
        let request_id = id.as_launch_token();

        match self.launch_with_retry(spec, &request_id).await {
            Ok(handle) => {
                let patch = RunPatch::default().started_at(Some(self.clock.now())).worker_handle(handle);
                // If the worker already raced us to a terminal status, the
                // later status wins and this CAS simply loses — that's fine.
                let _ = self.store.transition(id, RunStatus::Pending, RunStatus::Running, patch).await?;
                Ok(id)
            }
            Err(message) => {
                let patch = RunPatch::default().ended_at(Some(self.clock.now())).error_message(message.clone());
                let _ = self.store.transition(id, RunStatus::Pending, RunStatus::Failed, patch).await?;
                Err(CoordinatorError::LaunchFailed(message))
            }
        }
    }

    async fn launch_with_retry(&self, spec: WorkerSpec, request_id: &str) -> Result<String, String> {
        let mut backoff =
            Backoff::new(self.config.launch_retry_initial_backoff, self.config.launch_retry_budget);
        loop {
            match self.scheduler.launch(spec.clone(), request_id).await {
                Ok(handle) => return Ok(handle),
                Err(SchedulerError::Permanent(message)) => return Err(message),
                Err(SchedulerError::Transient(message)) => {
                    if !backoff.wait().await {
                        return Err(format!("launch retries exhausted: {message}"));
                    }
                }
            }
        }
    }

    /// Attempt to cancel a run. No-op if it is already terminal.
    pub async fn cancel(&self, id: RunId) -> Result<(), CoordinatorError> {
        let run = self.store.fetch(id).await?;
        if run.status.is_terminal() {
            return Ok(());
        }
        let patch = RunPatch::default().ended_at(Some(self.clock.now())).error_message("cancelled");
        let applied = self.store.transition(id, run.status, RunStatus::Cancelled, patch).await?;
        if applied {
            if let Some(handle) = run.worker_handle {
                let _ = self.scheduler.delete(&handle).await;
            }
        }
        Ok(())
    }

    /// One reaper sweep: inspect every active run's worker and fail any
    /// that have crashed or disappeared past the grace period. Returns how
    /// many runs were reaped.
    pub async fn reap(&self) -> Result<usize, CoordinatorError> {
        let active = self.store.list_active().await?;
        let mut reaped = 0;
        for run in active {
            let Some(handle) = run.worker_handle.clone() else {
                // Still pending with no worker yet; not this sweep's concern.
                continue;
            };
            let state = match self.scheduler.inspect(&handle).await {
                Ok(state) => state,
                Err(_) => continue,
            };
            let crashed = match state {
                runctl_scheduler::WorkerState::Failed => true,
                runctl_scheduler::WorkerState::Unknown => {
                    let since = run.started_at.unwrap_or(run.submitted_at);
                    self.clock.now().signed_duration_since(since)
                        >= chrono::Duration::from_std(self.config.reaper_unknown_grace).unwrap_or_default()
                }
                _ => false,
            };
            if !crashed {
                continue;
            }
            let patch = RunPatch::default()
                .ended_at(Some(self.clock.now()))
                .error_message("worker disappeared");
            if self.store.transition(run.id, run.status, RunStatus::Failed, patch).await? {
                let _ = self.scheduler.delete(&handle).await;
                reaped += 1;
            }
        }
        Ok(reaped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runctl_core::FakeClock;
    use runctl_scheduler::fake::FakeScheduler;
    use runctl_store::InMemoryRunStore;

    fn coordinator() -> Coordinator<InMemoryRunStore<FakeClock>, FakeScheduler, FakeClock> {
        let clock = FakeClock::new();
        Coordinator::new(
            InMemoryRunStore::with_clock(clock.clone()),
            FakeScheduler::new(),
            clock,
            CoordinatorConfig {
                launch_retry_budget: std::time::Duration::from_millis(50),
                launch_retry_initial_backoff: std::time::Duration::from_millis(5),
                ..CoordinatorConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn start_transitions_pending_to_running_on_launch_success() {
        let rc = coordinator();
        let id = rc.start(RunnableKind::Agent, "a1".into(), HashMap::new()).await.unwrap();
        let run = rc.store.fetch(id).await.unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.worker_handle.is_some());
        assert!(run.started_at.is_some());
    }

    #[tokio::test]
    async fn start_retries_transient_failures_then_succeeds() {
        let rc = coordinator();
        rc.scheduler.fail_launch_transiently(2);
        let id = rc.start(RunnableKind::Agent, "a1".into(), HashMap::new()).await.unwrap();
        assert_eq!(rc.store.fetch(id).await.unwrap().status, RunStatus::Running);
        assert_eq!(rc.scheduler.worker_count(), 1);
    }

    #[tokio::test]
    async fn start_fails_run_on_permanent_scheduler_error() {
        let rc = coordinator();
        rc.scheduler.fail_launch_permanently();
        let err = rc.start(RunnableKind::Agent, "a1".into(), HashMap::new()).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn cancel_on_running_run_deletes_worker_and_marks_cancelled() {
        let rc = coordinator();
        let id = rc.start(RunnableKind::Agent, "a1".into(), HashMap::new()).await.unwrap();
        rc.cancel(id).await.unwrap();
        let run = rc.store.fetch(id).await.unwrap();
        assert_eq!(run.status, RunStatus::Cancelled);
        assert_eq!(rc.scheduler.worker_count(), 0);
    }

    #[tokio::test]
    async fn cancel_on_terminal_run_is_a_no_op() {
        let rc = coordinator();
        let id = rc.start(RunnableKind::Agent, "a1".into(), HashMap::new()).await.unwrap();
        rc.cancel(id).await.unwrap();
        rc.cancel(id).await.unwrap(); // second cancel: no-op, no error
        assert_eq!(rc.store.fetch(id).await.unwrap().status, RunStatus::Cancelled);
    }

    #[tokio::test]
    async fn reap_fails_runs_whose_worker_crashed() {
        let rc = coordinator();
        let id = rc.start(RunnableKind::Agent, "a1".into(), HashMap::new()).await.unwrap();
        let handle = rc.store.fetch(id).await.unwrap().worker_handle.unwrap();
        rc.scheduler.set_state(&handle, runctl_scheduler::WorkerState::Failed);
        let reaped = rc.reap().await.unwrap();
        assert_eq!(reaped, 1);
        assert_eq!(rc.store.fetch(id).await.unwrap().status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn reap_leaves_healthy_runs_alone() {
        let rc = coordinator();
        let id = rc.start(RunnableKind::Agent, "a1".into(), HashMap::new()).await.unwrap();
        let reaped = rc.reap().await.unwrap();
        assert_eq!(reaped, 0);
        assert_eq!(rc.store.fetch(id).await.unwrap().status, RunStatus::Running);
    }

    #[tokio::test]
    async fn reap_waits_out_the_unknown_grace_period_before_failing() {
        let rc = coordinator();
        let id = rc.start(RunnableKind::Agent, "a1".into(), HashMap::new()).await.unwrap();
        let handle = rc.store.fetch(id).await.unwrap().worker_handle.unwrap();
        rc.scheduler.delete(&handle).await.unwrap(); // now Unknown to inspect()
        assert_eq!(rc.reap().await.unwrap(), 0);
        assert_eq!(rc.store.fetch(id).await.unwrap().status, RunStatus::Running);
    }
}
