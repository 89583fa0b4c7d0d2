// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Log Stream Gateway: `GET /ws/runs/{id}/logs`, upgraded to a
//! server-to-client-only WebSocket. The run's terminal status is polled
//! (rather than pushed) since log lines and status transitions travel on
//! separate channels with no ordering guarantee between them.

use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use runctl_core::{log_channel, RunId};
use std::time::Duration;

const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub async fn stream_run_logs(
    State(state): State<AppState>,
    Path(id): Path<RunId>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| forward_logs(socket, state, id))
}

async fn forward_logs(mut socket: WebSocket, state: AppState, id: RunId) {
    let mut subscription = state.bus.subscribe(&log_channel(id));
    let mut status_poll = tokio::time::interval(STATUS_POLL_INTERVAL);

    loop {
        tokio::select! {
            line = subscription.recv() => {
                let Some(line) = line else { break };
                if socket.send(Message::Text(String::from_utf8_lossy(&line).into_owned())).await.is_err() {
                    break;
                }
            }
            _ = status_poll.tick() => {
                match state.store.fetch(id).await {
                    Ok(run) if run.status.is_terminal() => break,
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        }
    }

    let _ = socket.send(Message::Close(None)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use runctl_bus::{BroadcastBus, MessageBus};

    #[tokio::test]
    async fn subscription_delivers_published_log_lines() {
        let bus = BroadcastBus::new(16);
        let id = RunId::new();
        let channel = log_channel(id);
        let mut sub = bus.subscribe(&channel);
        bus.publish(&channel, b"hello".to_vec().into());
        let line = sub.recv().await.unwrap();
        assert_eq!(&*line, b"hello");
    }
}
