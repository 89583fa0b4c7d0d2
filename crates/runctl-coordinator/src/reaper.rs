// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reaper's periodic task wrapper. The coordinator itself only exposes
//! `reap()` as a single sweep; this spawns it on a fixed period until
//! shutdown, single-writer by construction since the gateway binary runs
//! exactly one coordinator instance.

use crate::Coordinator;
use runctl_core::Clock;
use runctl_scheduler::ClusterSchedulerAdapter;
use runctl_store::RunStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub fn spawn_reaper<St, Sc, C>(
    coordinator: Arc<Coordinator<St, Sc, C>>,
    period: std::time::Duration,
    shutdown: CancellationToken,
) where
    St: RunStore,
    Sc: ClusterSchedulerAdapter,
    C: Clock,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(period) => {}
            }
            match coordinator.reap().await {
                Ok(0) => {}
                Ok(n) => tracing::info!(reaped = n, "reaper failed orphaned runs"),
                Err(e) => tracing::warn!(error = %e, "reaper sweep failed"),
            }
        }
    });
}
