// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! runctl - CLI for the run orchestration and streaming subsystem's
//! gateway.

mod client;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::GatewayClient;
use futures::StreamExt;
use runctl_core::{RunId, RunStatus, RunnableKind};
use std::collections::HashMap;

#[derive(Parser)]
#[command(name = "runctl", version, about = "Submit and inspect runs against a runctl gateway")]
struct Cli {
    /// Gateway base URL
    #[arg(long, env = "RUNCTL_GATEWAY_ADDR", default_value = "http://127.0.0.1:8080")]
    gateway: String,

    /// Bearer token for the gateway's public api
    #[arg(long, env = "RUNCTL_AUTH_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a new run
    Submit {
        #[arg(value_enum)]
        runnable_kind: RunnableKindArg,
        runnable_id: String,
        /// Input variable as key=value (repeatable); value is parsed as JSON if possible
        #[arg(long = "var", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,
    },
    /// Fetch a single run by id
    Get { id: String },
    /// List runs, optionally filtered
    List {
        #[arg(long)]
        runnable_id: Option<String>,
        #[arg(long, value_enum)]
        status: Option<RunStatusArg>,
    },
    /// Cancel a run
    Cancel { id: String },
    /// Stream a run's result chunks until it ends
    Stream { id: String },
}

#[derive(Clone, clap::ValueEnum)]
enum RunnableKindArg {
    Agent,
    Team,
}

impl From<RunnableKindArg> for RunnableKind {
    fn from(v: RunnableKindArg) -> Self {
        match v {
            RunnableKindArg::Agent => RunnableKind::Agent,
            RunnableKindArg::Team => RunnableKind::Team,
        }
    }
}

#[derive(Clone, clap::ValueEnum)]
enum RunStatusArg {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl From<RunStatusArg> for RunStatus {
    fn from(v: RunStatusArg) -> Self {
        match v {
            RunStatusArg::Pending => RunStatus::Pending,
            RunStatusArg::Running => RunStatus::Running,
            RunStatusArg::Completed => RunStatus::Completed,
            RunStatusArg::Failed => RunStatus::Failed,
            RunStatusArg::Cancelled => RunStatus::Cancelled,
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) => Ok((k.to_string(), v.to_string())),
        None => Err(format!("expected key=value, got '{s}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = GatewayClient::new(cli.gateway, cli.token);

    match cli.command {
        Commands::Submit { runnable_kind, runnable_id, vars } => {
            let input_variables: HashMap<String, serde_json::Value> = vars
                .into_iter()
                .map(|(k, v)| (k, serde_json::from_str(&v).unwrap_or(serde_json::Value::String(v))))
                .collect();
            let id = client.submit(runnable_kind.into(), runnable_id, input_variables).await?;
            println!("{id}");
        }
        Commands::Get { id } => {
            let run = client.get(parse_run_id(&id)?).await?;
            println!("{}", serde_json::to_string_pretty(&run)?);
        }
        Commands::List { runnable_id, status } => {
            let runs = client.list(runnable_id.as_deref(), status.map(Into::into)).await?;
            println!("{}", serde_json::to_string_pretty(&runs)?);
        }
        Commands::Cancel { id } => {
            client.cancel(parse_run_id(&id)?).await?;
            println!("cancelled");
        }
        Commands::Stream { id } => {
            let resp = client.stream_results(parse_run_id(&id)?).await?;
            let mut bytes = resp.bytes_stream();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.context("stream read failed")?;
                for line in String::from_utf8_lossy(&chunk).lines() {
                    if let Some(data) = line.strip_prefix("data: ") {
                        println!("{data}");
                    }
                }
            }
        }
    }

    Ok(())
}

fn parse_run_id(s: &str) -> Result<RunId> {
    s.parse().with_context(|| format!("'{s}' is not a valid run id"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn key_value_parsing_requires_an_equals_sign() {
        assert_eq!(parse_key_value("a=b").unwrap(), ("a".to_string(), "b".to_string()));
        assert!(parse_key_value("no-equals-sign").is_err());
    }

    #[test]
    fn run_id_parsing_rejects_garbage() {
        assert!(parse_run_id("not-a-uuid").is_err());
        let id = RunId::new();
        assert_eq!(parse_run_id(&id.to_string()).unwrap(), id);
    }
}
