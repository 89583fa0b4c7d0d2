// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A scheduler that dispatches to either the Kubernetes adapter or the
//! in-memory fake, chosen once at gateway startup from configuration. This
//! lets the gateway binary stay monomorphic (no trait objects threaded
//! through axum's `State`) while still supporting a fake-backed local
//! deployment for development.

use crate::fake::FakeScheduler;
use crate::k8s::KubernetesAdapter;
use crate::{ClusterSchedulerAdapter, SchedulerError, WorkerResource, WorkerSpec, WorkerState};
use async_trait::async_trait;
use std::sync::Arc;

pub enum AnyScheduler {
    Kubernetes(KubernetesAdapter),
    Fake(Arc<FakeScheduler>),
}

#[async_trait]
impl ClusterSchedulerAdapter for AnyScheduler {
    async fn launch(&self, spec: WorkerSpec, request_id: &str) -> Result<String, SchedulerError> {
        match self {
            Self::Kubernetes(a) => a.launch(spec, request_id).await,
            Self::Fake(a) => a.launch(spec, request_id).await,
        }
    }

    async fn inspect(&self, worker_handle: &str) -> Result<WorkerState, SchedulerError> {
        match self {
            Self::Kubernetes(a) => a.inspect(worker_handle).await,
            Self::Fake(a) => a.inspect(worker_handle).await,
        }
    }

    async fn delete(&self, worker_handle: &str) -> Result<(), SchedulerError> {
        match self {
            Self::Kubernetes(a) => a.delete(worker_handle).await,
            Self::Fake(a) => a.delete(worker_handle).await,
        }
    }

    async fn list_run_executors(&self) -> Result<Vec<WorkerResource>, SchedulerError> {
        match self {
            Self::Kubernetes(a) => a.list_run_executors().await,
            Self::Fake(a) => a.list_run_executors().await,
        }
    }
}
