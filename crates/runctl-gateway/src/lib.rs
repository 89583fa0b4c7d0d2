// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! runctl-gateway: the HTTP edge binding together the run store, message
//! bus, and coordinator — the public `/api/v1` surface, the internal
//! worker-callback routes, the result and log streaming gateways, and the
//! cleanup sweep.

pub mod auth;
pub mod cleanup;
pub mod config;
pub mod handlers;
pub mod state;

use crate::auth::{require_bearer_token, TokenVerifier};
use crate::state::AppState;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the full router: public edge (auth-gated), internal worker
/// callbacks (not auth-gated — reachable only from the cluster network),
/// and the unauthenticated health check.
pub fn build_router(state: AppState, verifier: Arc<dyn TokenVerifier>) -> Router {
    let public = Router::new()
        .route("/runs", post(handlers::rest::submit_run).get(handlers::rest::list_runs))
        .route("/runs/:id", get(handlers::rest::get_run))
        .route("/runs/:id/cancel", post(handlers::rest::cancel_run))
        .route("/runs/:id/stream", get(handlers::stream::stream_run_results))
        .route_layer(middleware::from_fn_with_state(verifier.clone(), require_bearer_token));

    let ws = Router::new()
        .route("/ws/runs/:id/logs", get(handlers::logs::stream_run_logs))
        .route_layer(middleware::from_fn_with_state(verifier, require_bearer_token));

    let internal = Router::new()
        .route("/internal/runs/:id/transition", post(handlers::internal::internal_transition))
        .route("/internal/bus/publish", post(handlers::internal::internal_publish));

    Router::new()
        .route("/healthz", get(handlers::rest::healthz))
        .nest("/api/v1", public)
        .merge(ws)
        .merge(internal)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::NoopVerifier;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use runctl_bus::BroadcastBus;
    use runctl_coordinator::{Coordinator, CoordinatorConfig};
    use runctl_scheduler::fake::FakeScheduler;
    use runctl_scheduler::AnyScheduler;
    use runctl_store::WalRunStore;
    use tower::ServiceExt;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = WalRunStore::open(dir.path().join("runs.log")).unwrap();
        let bus = BroadcastBus::new(16);
        let scheduler = Arc::new(AnyScheduler::Fake(FakeScheduler::new()));
        let coordinator = Arc::new(Coordinator::new(
            store.clone(),
            scheduler,
            runctl_core::SystemClock,
            CoordinatorConfig::default(),
        ));
        (AppState { store, bus, coordinator }, dir)
    }

    #[tokio::test]
    async fn healthz_requires_no_auth() {
        let (state, _dir) = test_state();
        let app = build_router(state, Arc::new(NoopVerifier));
        let resp = app.oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn public_runs_route_rejects_missing_bearer_token() {
        let (state, _dir) = test_state();
        let app = build_router(state, Arc::new(crate::auth::StaticTokenVerifier::new("secret")));
        let resp = app.oneshot(Request::builder().uri("/api/v1/runs").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
