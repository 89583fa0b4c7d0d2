// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idle-channel sweep: a long-running daemon must not grow the channel map
//! without bound as runs come and go.

use crate::BroadcastBus;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub(crate) fn spawn(bus: Arc<BroadcastBus>, idle_after: Duration, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let period = (idle_after / 4).max(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(period) => {}
            }
            let mut channels = bus.channels.lock();
            channels.retain(|name, state| {
                let idle = state.touched_at.elapsed() >= idle_after;
                let subscribed = state.tx.receiver_count() > 0;
                let keep = subscribed || !idle;
                if !keep {
                    tracing::debug!(channel = %name, "dropping idle message bus channel");
                }
                keep
            });
        }
    });
}
