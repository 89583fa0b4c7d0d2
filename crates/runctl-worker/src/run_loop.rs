// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker's top-level execution loop: resolve the runnable, drain its
//! chunk stream to the message bus, and write the terminal transition back
//! to the store with retry.

use crate::aggregate::OutputAggregator;
use crate::client::{GatewayClient, PatchBody};
use crate::config::WorkerConfig;
use crate::runnable::{RunnableError, RunnableResolver};
use runctl_core::{ResultEnvelope, RunStatus, MAX_CHUNK_BYTES};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;

/// Bounded wall-clock retry for the terminal transition: RS/MB
/// unavailability must not abandon a run that already reached `running`.
const TERMINAL_WRITE_RETRY_BUDGET: Duration = Duration::from_secs(60);

pub async fn execute(
    config: WorkerConfig,
    resolver: &dyn RunnableResolver,
    client: GatewayClient,
) {
    let runnable = match resolver.resolve(config.runnable_kind, &config.runnable_id).await {
        Ok(r) => r,
        Err(e) => {
            fail_with_retry(&client, &config, e.to_string()).await;
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel::<Value>(64);
    let mut aggregator = OutputAggregator::new();

    let run_handle = tokio::spawn({
        let client = client.clone();
        let result_channel = config.result_channel.clone();
        async move {
            while let Some(chunk) = rx.recv().await {
                for envelope in split_chunk(chunk) {
                    if let Ok(json) = serde_json::to_string(&envelope) {
                        let _ = client.publish(&result_channel, &json).await;
                    }
                }
            }
        }
    });

    let outcome = runnable.run(&config.input_variables, tx).await;
    // Drain remaining buffered chunks before reading the aggregate; the
    // forwarding task above owns publishing, so just wait for it to drain.
    let _ = run_handle.await;

    match outcome {
        Ok(final_output) => {
            aggregator.push(&final_output);
            let aggregated = aggregator.finish();
            let end = ResultEnvelope::end_ok();
            if let Ok(json) = serde_json::to_string(&end) {
                let _ = client.publish(&config.result_channel, &json).await;
            }
            transition_with_retry(
                &client,
                &config,
                RunStatus::Completed,
                PatchBody { output_data: Some(aggregated), ..default_ended_patch() },
            )
            .await;
        }
        Err(e) => fail_with_retry(&client, &config, e.to_string()).await,
    }
}

/// Split an oversized chunk into multiple envelopes of at most
/// `MAX_CHUNK_BYTES`. Non-string chunks are never split (the 1 MiB bound is
/// advisory for them; only string payloads are naturally sliceable without
/// corrupting structure).
fn split_chunk(chunk: Value) -> Vec<ResultEnvelope> {
    match chunk {
        Value::String(s) if s.len() > MAX_CHUNK_BYTES => s
            .as_bytes()
            .chunks(MAX_CHUNK_BYTES)
            .map(|b| ResultEnvelope::Chunk { payload: Value::String(String::from_utf8_lossy(b).into_owned()) })
            .collect(),
        other => vec![ResultEnvelope::Chunk { payload: other }],
    }
}

fn default_ended_patch() -> PatchBody {
    PatchBody { ended_at: Some(chrono::Utc::now()), ..Default::default() }
}

async fn fail_with_retry(client: &GatewayClient, config: &WorkerConfig, message: String) {
    let end = ResultEnvelope::end_error(message.clone());
    if let Ok(json) = serde_json::to_string(&end) {
        let _ = client.publish(&config.result_channel, &json).await;
    }
    transition_with_retry(
        client,
        config,
        RunStatus::Failed,
        PatchBody { error_message: Some(message), ..default_ended_patch() },
    )
    .await;
}

async fn transition_with_retry(
    client: &GatewayClient,
    config: &WorkerConfig,
    next: RunStatus,
    patch: PatchBody,
) {
    let deadline = tokio::time::Instant::now() + TERMINAL_WRITE_RETRY_BUDGET;
    let mut delay = Duration::from_millis(200);
    loop {
        match client.transition(config.run_id, RunStatus::Running, next, clone_patch(&patch)).await {
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(error = %e, "terminal transition failed, retrying");
            }
        }
        if tokio::time::Instant::now() >= deadline {
            tracing::error!("exhausted retry budget writing terminal run status");
            return;
        }
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(Duration::from_secs(5));
    }
}

fn clone_patch(p: &PatchBody) -> PatchBody {
    PatchBody {
        started_at: p.started_at,
        ended_at: p.ended_at,
        worker_handle: p.worker_handle.clone(),
        output_data: p.output_data.clone(),
        error_message: p.error_message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_chunks_are_not_split() {
        let out = split_chunk(Value::String("hi".into()));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn oversized_string_chunks_are_split_under_the_cap() {
        let big = "x".repeat(MAX_CHUNK_BYTES * 2 + 10);
        let out = split_chunk(Value::String(big));
        assert!(out.len() >= 2);
        for envelope in &out {
            if let ResultEnvelope::Chunk { payload: Value::String(s) } = envelope {
                assert!(s.len() <= MAX_CHUNK_BYTES);
            }
        }
    }
}
