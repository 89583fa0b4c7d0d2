// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Result Stream Gateway: `GET /api/v1/runs/{id}/stream` over
//! server-sent events.
//!
//! Subscription happens before the run's current status is read, so a run
//! that completes between the subscribe and the status check is never
//! silently missed — the subscriber either observes the real `end` chunk
//! on the channel or, if the run was already terminal at subscribe time,
//! gets a synthetic one built from the stored record.

use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use runctl_core::{result_channel, ResultEnvelope, RunId, RunStatus};
use std::convert::Infallible;
use std::time::Duration;

pub async fn stream_run_results(
    State(state): State<AppState>,
    Path(id): Path<RunId>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = state.bus.subscribe(&result_channel(id));
    let run = state.store.fetch(id).await.ok();

    let synthetic = run.filter(|r| r.status.is_terminal()).map(|r| match r.status {
        RunStatus::Completed => {
            vec![ResultEnvelope::Chunk { payload: r.output_data.unwrap_or(serde_json::Value::Null) }, ResultEnvelope::end_ok()]
        }
        _ => vec![ResultEnvelope::end_error(r.error_message.unwrap_or_else(|| "run ended".to_string()))],
    });

    let stream = async_stream::stream! {
        if let Some(envelopes) = synthetic {
            for env in envelopes {
                if let Ok(data) = serde_json::to_string(&env) {
                    yield Ok(Event::default().data(data));
                }
            }
            return;
        }

        while let Some(message) = subscription.recv().await {
            let Ok(env) = serde_json::from_slice::<ResultEnvelope>(&message) else { continue };
            let is_end = env.is_end();
            if let Ok(data) = serde_json::to_string(&env) {
                yield Ok(Event::default().data(data));
            }
            if is_end {
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use runctl_bus::{BroadcastBus, MessageBus};

    #[tokio::test]
    async fn live_subscription_forwards_chunks_until_end() {
        let bus = BroadcastBus::new(16);
        let id = RunId::new();
        let channel = result_channel(id);

        let mut sub = bus.subscribe(&channel);
        let chunk = ResultEnvelope::Chunk { payload: serde_json::json!({"text": "hi"}) };
        bus.publish(&channel, serde_json::to_vec(&chunk).unwrap().into());
        bus.publish(&channel, serde_json::to_vec(&ResultEnvelope::end_ok()).unwrap().into());

        let first = sub.recv().await.unwrap();
        let first: ResultEnvelope = serde_json::from_slice(&first).unwrap();
        assert!(matches!(first, ResultEnvelope::Chunk { .. }));

        let second = sub.recv().await.unwrap();
        let second: ResultEnvelope = serde_json::from_slice(&second).unwrap();
        assert!(second.is_end());
    }
}
