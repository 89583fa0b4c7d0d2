// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forwards every log record emitted during run execution to
//! `run_logs:{run_id}`. Configured once at worker boot — not a global
//! mutable singleton — and never allowed to block the execution path: a
//! failed publish is dropped and counted, the way agent log writes are
//! best-effort and never break the engine.

use crate::client::GatewayClient;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Count of log lines dropped because the bus publish failed. Exposed so
/// the worker can report it, not surfaced to the run record itself.
#[derive(Clone, Default)]
pub struct DroppedLogCounter(Arc<AtomicU64>);

impl DroppedLogCounter {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A `tracing_subscriber` layer that formats each event as one line and
/// hands it to a background task for publishing, so formatting never
/// blocks on network I/O.
pub struct BusLogLayer {
    tx: mpsc::UnboundedSender<String>,
}

impl BusLogLayer {
    /// Spawns the background publisher task and returns the layer plus a
    /// handle to its drop counter.
    pub fn spawn(client: GatewayClient, log_channel: String) -> (Self, DroppedLogCounter) {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let dropped = DroppedLogCounter::default();
        let dropped_for_task = dropped.clone();
        tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                if client.publish(&log_channel, &line).await.is_err() {
                    dropped_for_task.0.fetch_add(1, Ordering::Relaxed);
                }
            }
        });
        (Self { tx }, dropped)
    }
}

struct LineVisitor(String);

impl Visit for LineVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        } else if !self.0.is_empty() {
            self.0.push_str(&format!(" {}={:?}", field.name(), value));
        }
    }
}

impl<S> Layer<S> for BusLogLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LineVisitor(String::new());
        event.record(&mut visitor);
        let line = format!("[{}] {}", event.metadata().level(), visitor.0);
        // An unbounded send only fails if the receiver task died, which
        // only happens if the process is already shutting down.
        let _ = self.tx.send(line);
    }
}
