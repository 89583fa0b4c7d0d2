// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! runctl-scheduler: a thin contract over the cluster's container
//! orchestrator, plus the concrete Kubernetes implementation and an
//! in-memory fake for tests. No business logic lives here: the coordinator
//! decides when to launch, retry, or reap; this crate only knows how to
//! talk to the cluster.

mod any;
pub mod fake;
pub mod k8s;

pub use any::AnyScheduler;

use async_trait::async_trait;
use runctl_core::{RunId, RunnableKind};
use thiserror::Error;

/// Label applied to every run-executor worker resource so the reaper and
/// the cleanup sweep can select them independent of run bookkeeping.
pub const RUN_EXECUTOR_LABEL: &str = "runctl.dev/run-executor";

#[derive(Debug, Error, Clone)]
pub enum SchedulerError {
    #[error("transient scheduler failure: {0}")]
    Transient(String),
    #[error("permanent scheduler failure: {0}")]
    Permanent(String),
}

impl From<SchedulerError> for runctl_core::UpstreamError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::Transient(m) => runctl_core::UpstreamError::Transient(m),
            SchedulerError::Permanent(m) => runctl_core::UpstreamError::Permanent(m),
        }
    }
}

/// Observed state of a scheduled worker resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Active,
    Succeeded,
    Failed,
    /// The resource could not be found. Only treated as `Failed` by the
    /// reaper after a grace period, since a pod can briefly be unreadable
    /// right after creation.
    Unknown,
}

/// Everything needed to launch one run's worker.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub run_id: RunId,
    pub runnable_kind: RunnableKind,
    pub runnable_id: String,
    pub input_variables: std::collections::HashMap<String, serde_json::Value>,
    pub image: String,
    pub env: Vec<(String, String)>,
    pub cpu_request: String,
    pub memory_request: String,
    pub cpu_limit: String,
    pub memory_limit: String,
}

/// One worker resource observed by the cleanup sweep.
#[derive(Debug, Clone)]
pub struct WorkerResource {
    pub handle: String,
    pub state: WorkerState,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Contract over an opaque cluster scheduler.
#[async_trait]
pub trait ClusterSchedulerAdapter: Send + Sync + 'static {
    /// Launch a one-shot worker. `request_id` must make this call
    /// idempotent: calling `launch` twice with the same `request_id`
    /// creates at most one worker.
    async fn launch(&self, spec: WorkerSpec, request_id: &str) -> Result<String, SchedulerError>;

    async fn inspect(&self, worker_handle: &str) -> Result<WorkerState, SchedulerError>;

    /// Idempotent teardown; deleting an already-gone resource is not an
    /// error.
    async fn delete(&self, worker_handle: &str) -> Result<(), SchedulerError>;

    /// List every run-executor resource, for the cleanup sweep.
    async fn list_run_executors(&self) -> Result<Vec<WorkerResource>, SchedulerError>;
}
