// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The cleanup sweep: periodically deletes worker resources for runs that
//! finished long enough ago, independent of the reaper (which only cares
//! about crash detection, not tidiness). Shaped the same way as
//! `runctl_coordinator::spawn_reaper`: a fixed-period task bounded by a
//! cancellation token.

use crate::state::{Scheduler, Store};
use chrono::Utc;
use runctl_scheduler::{ClusterSchedulerAdapter, WorkerState};
use runctl_store::RunStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub fn spawn_cleanup_sweep(
    store: Arc<Store>,
    scheduler: Arc<Scheduler>,
    period: Duration,
    completed_age: Duration,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(period) => {}
            }
            match sweep_once(&store, &scheduler, completed_age).await {
                Ok(0) => {}
                Ok(n) => tracing::info!(deleted = n, "cleanup sweep removed finished worker resources"),
                Err(e) => tracing::warn!(error = %e, "cleanup sweep failed"),
            }
        }
    });
}

async fn sweep_once(
    store: &Arc<Store>,
    scheduler: &Arc<Scheduler>,
    completed_age: Duration,
) -> Result<usize, runctl_scheduler::SchedulerError> {
    let resources = scheduler.list_run_executors().await?;
    let active_handles: std::collections::HashSet<String> = store
        .list_active()
        .await
        .map(|runs| runs.into_iter().filter_map(|r| r.worker_handle).collect())
        .unwrap_or_default();
    let ended_at_by_handle: std::collections::HashMap<String, chrono::DateTime<Utc>> = store
        .list(runctl_store::RunFilter::default())
        .await
        .map(|runs| {
            runs.into_iter()
                .filter_map(|r| Some((r.worker_handle?, r.ended_at?)))
                .collect()
        })
        .unwrap_or_default();

    let age = chrono::Duration::from_std(completed_age).unwrap_or_default();
    let mut deleted = 0;
    for resource in resources {
        if active_handles.contains(&resource.handle) {
            continue;
        }
        let finished = matches!(resource.state, WorkerState::Succeeded | WorkerState::Failed);
        if !finished {
            continue;
        }
        let since = ended_at_by_handle.get(&resource.handle).copied().unwrap_or(resource.created_at);
        if Utc::now().signed_duration_since(since) >= age {
            let _ = scheduler.delete(&resource.handle).await;
            deleted += 1;
        }
    }
    Ok(deleted)
}
