// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entry point for the run-executor container image.

use runctl_worker::client::GatewayClient;
use runctl_worker::log_sink::BusLogLayer;
use runctl_worker::runnable::StubResolver;
use runctl_worker::WorkerConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    let config = match WorkerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("runctl-worker: invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let client = GatewayClient::new(config.gateway_addr.clone());
    let (log_layer, _dropped) = BusLogLayer::spawn(client.clone(), config.log_channel.clone());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(log_layer)
        .init();

    tracing::info!(run_id = %config.run_id, "worker starting");
    runctl_worker::execute(config, &StubResolver, client).await;
}
