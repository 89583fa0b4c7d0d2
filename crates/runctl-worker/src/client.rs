// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client the worker uses to reach the run store and message bus,
//! both of which live inside the gateway process. The worker is launched
//! as a separate out-of-process container, so these are real network
//! calls, not in-process trait objects.

use chrono::{DateTime, Utc};
use runctl_core::{RunId, RunStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize, Default)]
pub struct PatchBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
struct TransitionRequest {
    expected: RunStatus,
    next: RunStatus,
    patch: PatchBody,
}

#[derive(Debug, Deserialize)]
struct TransitionResponse {
    applied: bool,
}

#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    channel: &'a str,
    body: &'a str,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into() }
    }

    pub async fn transition(
        &self,
        id: RunId,
        expected: RunStatus,
        next: RunStatus,
        patch: PatchBody,
    ) -> Result<bool, ClientError> {
        let url = format!("{}/internal/runs/{}/transition", self.base_url, id);
        let resp: TransitionResponse =
            self.http.post(url).json(&TransitionRequest { expected, next, patch }).send().await?.json().await?;
        Ok(resp.applied)
    }

    pub async fn publish(&self, channel: &str, body: &str) -> Result<(), ClientError> {
        let url = format!("{}/internal/bus/publish", self.base_url);
        self.http.post(url).json(&PublishRequest { channel, body }).send().await?;
        Ok(())
    }
}
