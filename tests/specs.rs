// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios against a live gateway instance, bound to an
//! ephemeral port. Workers are simulated by calling the same internal
//! endpoints a real worker container would call, so these tests exercise
//! the coordinator, store, bus, and HTTP edge together without needing a
//! container runtime.

use futures::StreamExt;
use runctl_bus::BroadcastBus;
use runctl_coordinator::{Coordinator, CoordinatorConfig};
use runctl_core::{RunId, RunStatus, RunnableKind};
use runctl_gateway::auth::NoopVerifier;
use runctl_gateway::build_router;
use runctl_gateway::state::AppState;
use runctl_scheduler::fake::FakeScheduler;
use runctl_scheduler::AnyScheduler;
use runctl_store::WalRunStore;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

struct TestGateway {
    base_url: String,
    #[allow(dead_code)]
    dir: tempfile::TempDir,
    scheduler: Arc<FakeScheduler>,
    coordinator: Arc<Coordinator<WalRunStore, AnyScheduler>>,
}

async fn spawn_gateway() -> TestGateway {
    let dir = tempfile::tempdir().unwrap();
    let store = WalRunStore::open(dir.path().join("runs.log")).unwrap();
    let bus = BroadcastBus::new(1024);
    let fake = FakeScheduler::new();
    let scheduler = Arc::new(AnyScheduler::Fake(fake.clone()));
    let coordinator = Arc::new(Coordinator::new(
        store.clone(),
        scheduler,
        runctl_core::SystemClock,
        CoordinatorConfig {
            launch_retry_budget: Duration::from_millis(200),
            launch_retry_initial_backoff: Duration::from_millis(5),
            ..CoordinatorConfig::default()
        },
    ));
    let state = AppState { store, bus, coordinator: coordinator.clone() };
    let app = build_router(state, Arc::new(NoopVerifier));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestGateway { base_url: format!("http://{addr}"), dir, scheduler: fake, coordinator }
}

async fn submit(gw: &TestGateway, client: &reqwest::Client) -> RunId {
    let resp = client
        .post(format!("{}/api/v1/runs", gw.base_url))
        .json(&json!({"runnable_type": "agent", "runnable_id": "a1", "input_variables": {"message": "hi"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert!(matches!(body["status"].as_str(), Some("pending") | Some("running")));
    body["id"].as_str().unwrap().parse().unwrap()
}

async fn simulate_chunk(gw: &TestGateway, client: &reqwest::Client, id: RunId, payload: Value) {
    let envelope = json!({"kind": "chunk", "payload": payload});
    client
        .post(format!("{}/internal/bus/publish", gw.base_url))
        .json(&json!({"channel": format!("run_results:{id}"), "body": envelope.to_string()}))
        .send()
        .await
        .unwrap();
}

async fn simulate_end(gw: &TestGateway, client: &reqwest::Client, id: RunId, error: Option<&str>) {
    let envelope = match error {
        Some(e) => json!({"kind": "end", "error": e}),
        None => json!({"kind": "end"}),
    };
    client
        .post(format!("{}/internal/bus/publish", gw.base_url))
        .json(&json!({"channel": format!("run_results:{id}"), "body": envelope.to_string()}))
        .send()
        .await
        .unwrap();
}

async fn simulate_terminal_transition(
    gw: &TestGateway,
    client: &reqwest::Client,
    id: RunId,
    expected: RunStatus,
    next: RunStatus,
    output_data: Option<Value>,
    error_message: Option<&str>,
) -> bool {
    let resp = client
        .post(format!("{}/internal/runs/{id}/transition", gw.base_url))
        .json(&json!({
            "expected": expected,
            "next": next,
            "patch": {
                "ended_at": chrono::Utc::now(),
                "output_data": output_data,
                "error_message": error_message,
            }
        }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    body["applied"].as_bool().unwrap()
}

/// S1 — happy path: submit, worker streams two chunks then completes, the
/// live stream observes them in order, and the final record reflects the
/// aggregated output.
#[tokio::test]
async fn s1_happy_path_agent_run() {
    let gw = spawn_gateway().await;
    let client = reqwest::Client::new();
    let id = submit(&gw, &client).await;

    // Wait for the coordinator to move the run into `running`.
    wait_for_status(&gw, &client, id, RunStatus::Running).await;

    let stream_client = client.clone();
    let base = gw.base_url.clone();
    let reader = tokio::spawn(async move {
        let resp = stream_client.get(format!("{base}/api/v1/runs/{id}/stream")).send().await.unwrap();
        let mut bytes = resp.bytes_stream();
        let mut lines = Vec::new();
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.unwrap();
            for line in String::from_utf8_lossy(&chunk).lines() {
                if let Some(data) = line.strip_prefix("data: ") {
                    lines.push(data.to_string());
                    if data.contains("\"end\"") {
                        return lines;
                    }
                }
            }
        }
        lines
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    simulate_chunk(&gw, &client, id, json!("he")).await;
    simulate_chunk(&gw, &client, id, json!("llo")).await;
    simulate_end(&gw, &client, id, None).await;
    simulate_terminal_transition(&gw, &client, id, RunStatus::Running, RunStatus::Completed, Some(json!("hello")), None)
        .await;

    let lines = tokio::time::timeout(Duration::from_secs(5), reader).await.unwrap().unwrap();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("\"he\""));
    assert!(lines[1].contains("\"llo\""));
    assert!(lines[2].contains("\"end\""));

    let run: Value = client.get(format!("{}/api/v1/runs/{}", gw.base_url, id)).send().await.unwrap().json().await.unwrap();
    assert_eq!(run["status"], "completed");
    assert_eq!(run["output_data"], "hello");
}

/// S2 — a client that subscribes after the run is already terminal gets a
/// synthetic reconstruction instead of nothing.
#[tokio::test]
async fn s2_late_subscriber_to_finished_run() {
    let gw = spawn_gateway().await;
    let client = reqwest::Client::new();
    let id = submit(&gw, &client).await;
    wait_for_status(&gw, &client, id, RunStatus::Running).await;

    simulate_terminal_transition(&gw, &client, id, RunStatus::Running, RunStatus::Completed, Some(json!("hello")), None)
        .await;

    let resp = client.get(format!("{}/api/v1/runs/{}/stream", gw.base_url, id)).send().await.unwrap();
    let body = resp.text().await.unwrap();
    assert!(body.contains("\"hello\""));
    assert!(body.contains("\"end\""));
}

/// S3 — the reaper fails a run whose worker vanished without a terminal
/// transition.
#[tokio::test]
async fn s3_worker_crash_is_reaped() {
    let gw = spawn_gateway().await;
    let client = reqwest::Client::new();
    let id = submit(&gw, &client).await;
    wait_for_status(&gw, &client, id, RunStatus::Running).await;

    let run: Value = client.get(format!("{}/api/v1/runs/{}", gw.base_url, id)).send().await.unwrap().json().await.unwrap();
    let handle = run["worker_handle"].as_str().unwrap().to_string();
    gw.scheduler.set_state(&handle, runctl_scheduler::WorkerState::Failed);

    // Drive a reap sweep directly rather than waiting out the gateway's
    // real background period.
    let reaped = gw.coordinator.reap().await.unwrap();
    assert_eq!(reaped, 1);

    let run: Value = client.get(format!("{}/api/v1/runs/{}", gw.base_url, id)).send().await.unwrap().json().await.unwrap();
    assert_eq!(run["status"], "failed");
    assert!(run["error_message"].as_str().unwrap().contains("disappeared"));
}

/// S4 — cancellation marks the run cancelled and tears down the worker.
#[tokio::test]
async fn s4_cancellation() {
    let gw = spawn_gateway().await;
    let client = reqwest::Client::new();
    let id = submit(&gw, &client).await;
    wait_for_status(&gw, &client, id, RunStatus::Running).await;

    let resp = client.post(format!("{}/api/v1/runs/{}/cancel", gw.base_url, id)).send().await.unwrap();
    assert!(resp.status().is_success());

    let run: Value = client.get(format!("{}/api/v1/runs/{}", gw.base_url, id)).send().await.unwrap().json().await.unwrap();
    assert_eq!(run["status"], "cancelled");
    assert!(run["ended_at"].is_string());
    assert_eq!(gw.scheduler.worker_count(), 0);
}

/// S6 — the coordinator retries a transiently-failing launch and still
/// produces exactly one worker and one terminal write.
#[tokio::test]
async fn s6_coordinator_retries_launch_then_succeeds() {
    let gw = spawn_gateway().await;
    gw.scheduler.fail_launch_transiently(2);
    let client = reqwest::Client::new();
    let id = submit(&gw, &client).await;

    wait_for_status(&gw, &client, id, RunStatus::Running).await;
    assert_eq!(gw.scheduler.worker_count(), 1);

    let applied = simulate_terminal_transition(
        &gw,
        &client,
        id,
        RunStatus::Running,
        RunStatus::Completed,
        Some(json!("done")),
        None,
    )
    .await;
    assert!(applied);
    // A second attempt to apply the same terminal transition must lose the
    // race: the status is no longer `running`.
    let second = simulate_terminal_transition(
        &gw,
        &client,
        id,
        RunStatus::Running,
        RunStatus::Completed,
        Some(json!("done")),
        None,
    )
    .await;
    assert!(!second);
}

async fn wait_for_status(gw: &TestGateway, client: &reqwest::Client, id: RunId, status: RunStatus) {
    for _ in 0..50 {
        let run: Value = client.get(format!("{}/api/v1/runs/{}", gw.base_url, id)).send().await.unwrap().json().await.unwrap();
        if run["status"] == serde_json::to_value(status).unwrap() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("run {id} never reached status {status}");
}
