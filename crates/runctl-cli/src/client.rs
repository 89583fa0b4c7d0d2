// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin HTTP client over the gateway's public `/api/v1` surface.

use anyhow::{bail, Context, Result};
use runctl_core::{Run, RunId, RunStatus, RunnableKind};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubmitRunRequest {
    #[serde(rename = "runnable_type")]
    runnable_kind: RunnableKind,
    runnable_id: String,
    input_variables: HashMap<String, Value>,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into(), token }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let mut req = self.http.request(method, url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    pub async fn submit(
        &self,
        runnable_kind: RunnableKind,
        runnable_id: String,
        input_variables: HashMap<String, Value>,
    ) -> Result<RunId> {
        #[derive(serde::Deserialize)]
        struct Response {
            id: RunId,
        }
        let resp = self
            .request(reqwest::Method::POST, "/api/v1/runs")
            .json(&SubmitRunRequest { runnable_kind, runnable_id, input_variables })
            .send()
            .await
            .context("failed to reach gateway")?;
        ensure_ok(&resp)?;
        let body: Response = resp.json().await.context("malformed submit response")?;
        Ok(body.id)
    }

    pub async fn get(&self, id: RunId) -> Result<Run> {
        let resp = self.request(reqwest::Method::GET, &format!("/api/v1/runs/{id}")).send().await?;
        ensure_ok(&resp)?;
        Ok(resp.json().await.context("malformed run response")?)
    }

    pub async fn list(&self, runnable_id: Option<&str>, status: Option<RunStatus>) -> Result<Vec<Run>> {
        let mut req = self.request(reqwest::Method::GET, "/api/v1/runs");
        if let Some(runnable_id) = runnable_id {
            req = req.query(&[("runnable_id", runnable_id)]);
        }
        if let Some(status) = status {
            req = req.query(&[("status", status.to_string())]);
        }
        let resp = req.send().await?;
        ensure_ok(&resp)?;
        Ok(resp.json().await.context("malformed run list response")?)
    }

    pub async fn cancel(&self, id: RunId) -> Result<()> {
        let resp = self.request(reqwest::Method::POST, &format!("/api/v1/runs/{id}/cancel")).send().await?;
        ensure_ok(&resp)?;
        Ok(())
    }

    /// Stream the raw SSE body of `/runs/{id}/stream`, one `data: ...` line at a time.
    pub async fn stream_results(&self, id: RunId) -> Result<reqwest::Response> {
        let resp = self.request(reqwest::Method::GET, &format!("/api/v1/runs/{id}/stream")).send().await?;
        ensure_ok(&resp)?;
        Ok(resp)
    }
}

fn ensure_ok(resp: &reqwest::Response) -> Result<()> {
    if !resp.status().is_success() {
        bail!("gateway returned {}", resp.status());
    }
    Ok(())
}
