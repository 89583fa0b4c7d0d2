// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory scheduler fake for the coordinator's and gateways' tests.

use crate::{ClusterSchedulerAdapter, SchedulerError, WorkerResource, WorkerSpec, WorkerState};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
struct Entry {
    state: WorkerState,
    created_at: chrono::DateTime<chrono::Utc>,
}

/// A scheduler fake whose `launch` can be scripted to fail N times before
/// succeeding, for exercising the coordinator's retry/backoff path.
pub struct FakeScheduler {
    workers: Mutex<HashMap<String, Entry>>,
    transient_failures_remaining: Mutex<u32>,
    permanent_failure: Mutex<bool>,
}

impl FakeScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            workers: Mutex::new(HashMap::new()),
            transient_failures_remaining: Mutex::new(0),
            permanent_failure: Mutex::new(false),
        })
    }

    pub fn fail_launch_transiently(self: &Arc<Self>, times: u32) {
        *self.transient_failures_remaining.lock() = times;
    }

    pub fn fail_launch_permanently(self: &Arc<Self>) {
        *self.permanent_failure.lock() = true;
    }

    pub fn set_state(&self, handle: &str, state: WorkerState) {
        if let Some(e) = self.workers.lock().get_mut(handle) {
            e.state = state;
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }
}

impl Default for FakeScheduler {
    fn default() -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
            transient_failures_remaining: Mutex::new(0),
            permanent_failure: Mutex::new(false),
        }
    }
}

#[async_trait]
impl ClusterSchedulerAdapter for FakeScheduler {
    async fn launch(&self, _spec: WorkerSpec, request_id: &str) -> Result<String, SchedulerError> {
        if *self.permanent_failure.lock() {
            return Err(SchedulerError::Permanent("fake permanent failure".into()));
        }
        {
            let mut remaining = self.transient_failures_remaining.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SchedulerError::Transient("fake transient failure".into()));
            }
        }
        let handle = format!("fake-{request_id}");
        self.workers
            .lock()
            .entry(handle.clone())
            .or_insert(Entry { state: WorkerState::Active, created_at: chrono::Utc::now() });
        Ok(handle)
    }

    async fn inspect(&self, worker_handle: &str) -> Result<WorkerState, SchedulerError> {
        Ok(self.workers.lock().get(worker_handle).map(|e| e.state).unwrap_or(WorkerState::Unknown))
    }

    async fn delete(&self, worker_handle: &str) -> Result<(), SchedulerError> {
        self.workers.lock().remove(worker_handle);
        Ok(())
    }

    async fn list_run_executors(&self) -> Result<Vec<WorkerResource>, SchedulerError> {
        Ok(self
            .workers
            .lock()
            .iter()
            .map(|(handle, e)| WorkerResource {
                handle: handle.clone(),
                state: e.state,
                created_at: e.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runctl_core::{RunId, RunnableKind};

    fn spec() -> WorkerSpec {
        WorkerSpec {
            run_id: RunId::new(),
            runnable_kind: RunnableKind::Agent,
            runnable_id: "a1".into(),
            input_variables: std::collections::HashMap::new(),
            image: "runctl/worker:latest".into(),
            env: vec![],
            cpu_request: "100m".into(),
            memory_request: "128Mi".into(),
            cpu_limit: "500m".into(),
            memory_limit: "512Mi".into(),
        }
    }

    #[tokio::test]
    async fn launch_is_idempotent_on_request_id() {
        let fake = FakeScheduler::new();
        let h1 = fake.launch(spec(), "tok-1").await.unwrap();
        let h2 = fake.launch(spec(), "tok-1").await.unwrap();
        assert_eq!(h1, h2);
        assert_eq!(fake.worker_count(), 1);
    }

    #[tokio::test]
    async fn retries_exhaust_then_succeed() {
        let fake = FakeScheduler::new();
        fake.fail_launch_transiently(2);
        assert!(fake.launch(spec(), "tok").await.is_err());
        assert!(fake.launch(spec(), "tok").await.is_err());
        assert!(fake.launch(spec(), "tok").await.is_ok());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let fake = FakeScheduler::new();
        let h = fake.launch(spec(), "tok").await.unwrap();
        fake.delete(&h).await.unwrap();
        fake.delete(&h).await.unwrap();
    }
}
