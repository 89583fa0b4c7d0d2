// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Internal callback routes reached by the worker container, never exposed
//! on the public edge. The wire shapes here must match
//! `runctl_worker::client::GatewayClient` exactly, since that's the only
//! caller.

use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use runctl_core::{RunId, RunPatch, RunStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize, Default)]
pub struct PatchBody {
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub worker_handle: Option<String>,
    pub output_data: Option<Value>,
    pub error_message: Option<String>,
}

impl From<PatchBody> for RunPatch {
    fn from(p: PatchBody) -> Self {
        Self {
            started_at: p.started_at,
            ended_at: p.ended_at,
            worker_handle: p.worker_handle,
            output_data: p.output_data,
            error_message: p.error_message,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub expected: RunStatus,
    pub next: RunStatus,
    pub patch: PatchBody,
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub applied: bool,
}

pub async fn internal_transition(
    State(state): State<AppState>,
    Path(id): Path<RunId>,
    Json(body): Json<TransitionRequest>,
) -> Result<Json<TransitionResponse>, StatusCode> {
    let applied = state
        .store
        .transition(id, body.expected, body.next, body.patch.into())
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(TransitionResponse { applied }))
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub channel: String,
    pub body: String,
}

pub async fn internal_publish(State(state): State<AppState>, Json(body): Json<PublishRequest>) -> StatusCode {
    state.bus.publish(&body.channel, body.body.into_bytes().into());
    StatusCode::ACCEPTED
}
