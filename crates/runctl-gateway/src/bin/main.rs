// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entry point for the gateway process: HTTP edge, result/log streaming,
//! run coordination, and the background reaper and cleanup sweep.

use anyhow::Context;
use runctl_bus::BroadcastBus;
use runctl_coordinator::{spawn_reaper, Coordinator, CoordinatorConfig};
use runctl_gateway::auth::{NoopVerifier, StaticTokenVerifier, TokenVerifier};
use runctl_gateway::config::{GatewayConfig, LogFormat};
use runctl_gateway::state::AppState;
use runctl_gateway::{build_router, cleanup};
use runctl_scheduler::fake::FakeScheduler;
use runctl_scheduler::k8s::{KubernetesAdapter, KubernetesConfig};
use runctl_scheduler::AnyScheduler;
use runctl_store::WalRunStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("RUNCTL_CONFIG_FILE").ok().map(PathBuf::from);
    let config = GatewayConfig::load(config_path.as_deref()).context("invalid configuration")?;

    init_tracing(config.log_format);

    if let Some(parent) = std::path::Path::new(&config.store_path).parent() {
        std::fs::create_dir_all(parent).context("failed to create store directory")?;
    }
    let store = WalRunStore::open(&config.store_path).context("failed to open run store")?;

    let bus = BroadcastBus::new(config.result_channel_buffer);

    let scheduler: Arc<AnyScheduler> = if config.use_fake_scheduler {
        tracing::warn!("running with the fake scheduler; no real workers will be launched");
        Arc::new(AnyScheduler::Fake(FakeScheduler::new()))
    } else {
        let k8s_config = KubernetesConfig {
            namespace: std::env::var("RUNCTL_K8S_NAMESPACE").unwrap_or_else(|_| "default".to_string()),
            credential_secret: std::env::var("RUNCTL_CREDENTIAL_SECRET").ok(),
            bus_addr: std::env::var("RUNCTL_BUS_ADDR").unwrap_or_default(),
            store_addr: std::env::var("RUNCTL_STORE_ADDR").unwrap_or_default(),
        };
        let adapter = KubernetesAdapter::new(k8s_config).await.context("failed to initialize kubernetes adapter")?;
        Arc::new(AnyScheduler::Kubernetes(adapter))
    };

    let coordinator_config = CoordinatorConfig {
        launch_retry_budget: config.launch_retry_budget,
        reaper_period: config.reaper_period,
        reaper_unknown_grace: config.reaper_unknown_grace,
        worker_image: config.worker_image.clone(),
        cpu_request: config.cpu_request.clone(),
        memory_request: config.memory_request.clone(),
        cpu_limit: config.cpu_limit.clone(),
        memory_limit: config.memory_limit.clone(),
        ..CoordinatorConfig::default()
    };
    let coordinator =
        Arc::new(Coordinator::new(store.clone(), Arc::clone(&scheduler), runctl_core::SystemClock, coordinator_config));

    let shutdown = CancellationToken::new();
    spawn_reaper(Arc::clone(&coordinator), config.reaper_period, shutdown.clone());
    bus.spawn_gc(config.reaper_unknown_grace.max(std::time::Duration::from_secs(300)), shutdown.clone());
    cleanup::spawn_cleanup_sweep(
        store.clone(),
        scheduler,
        config.cleanup_sweep_period,
        config.cleanup_completed_age,
        shutdown.clone(),
    );

    let verifier: Arc<dyn TokenVerifier> = match &config.auth_token {
        Some(token) => Arc::new(StaticTokenVerifier::new(token.clone())),
        None => {
            tracing::warn!("no RUNCTL_AUTH_TOKEN configured; the public api surface is unauthenticated");
            Arc::new(NoopVerifier)
        }
    };

    let state = AppState { store, bus, coordinator };
    let app = build_router(state, verifier);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "runctl-gateway listening");

    let shutdown_signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown_signal.cancel();
        })
        .await
        .context("server failed")?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::from_default_env();
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer().json()).init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer()).init();
        }
    }
}
