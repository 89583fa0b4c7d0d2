// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The public `/api/v1/runs` surface: submit, list, fetch, cancel.

use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use runctl_core::{Run, RunId, RunStatus, RunnableKind};
use runctl_store::RunFilter;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct SubmitRunRequest {
    #[serde(rename = "runnable_type")]
    pub runnable_kind: RunnableKind,
    pub runnable_id: String,
    #[serde(default)]
    pub input_variables: HashMap<String, Value>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListRunsQuery {
    pub runnable_id: Option<String>,
    pub status: Option<RunStatus>,
}

pub async fn submit_run(
    State(state): State<AppState>,
    Json(body): Json<SubmitRunRequest>,
) -> Result<(StatusCode, Json<Run>), ApiError> {
    let id = state
        .coordinator
        .start(body.runnable_kind, body.runnable_id, body.input_variables)
        .await
        .map_err(ApiError::from)?;
    let run = state.store.fetch(id).await?;
    Ok((StatusCode::CREATED, Json(run)))
}

pub async fn get_run(State(state): State<AppState>, Path(id): Path<RunId>) -> Result<Json<Run>, ApiError> {
    let run = state.store.fetch(id).await?;
    Ok(Json(run))
}

pub async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<ListRunsQuery>,
) -> Result<Json<Vec<Run>>, ApiError> {
    let filter = RunFilter { runnable_id: query.runnable_id, status: query.status };
    let runs = state.store.list(filter).await?;
    Ok(Json(runs))
}

pub async fn cancel_run(State(state): State<AppState>, Path(id): Path<RunId>) -> Result<Json<Run>, ApiError> {
    state.coordinator.cancel(id).await.map_err(ApiError::from)?;
    let run = state.store.fetch(id).await?;
    Ok(Json(run))
}

pub async fn healthz() -> &'static str {
    "ok"
}

/// Maps store/coordinator errors onto the HTTP surface. Not-found becomes
/// 404; everything else is a 500, since a CAS conflict here means a
/// caller-visible bug, not a client mistake.
pub enum ApiError {
    NotFound,
    Internal(String),
}

impl From<runctl_store::StoreError> for ApiError {
    fn from(e: runctl_store::StoreError) -> Self {
        match e {
            runctl_store::StoreError::NotFound(_) => Self::NotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<runctl_coordinator::CoordinatorError> for ApiError {
    fn from(e: runctl_coordinator::CoordinatorError) -> Self {
        match e {
            runctl_coordinator::CoordinatorError::NotFound(_) => Self::NotFound,
            runctl_coordinator::CoordinatorError::Store(inner) => inner.into(),
            runctl_coordinator::CoordinatorError::LaunchFailed(m) => Self::Internal(m),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => (StatusCode::NOT_FOUND, "run not found").into_response(),
            Self::Internal(message) => {
                tracing::error!(%message, "internal api error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}
