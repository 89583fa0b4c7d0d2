// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the worker binary, one
//! function per setting, the way the gateway's own config module reads
//! its environment.

use runctl_core::{RunId, RunnableKind};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

/// Everything the worker invocation contract promises to hand the process.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub run_id: RunId,
    pub runnable_kind: RunnableKind,
    pub runnable_id: String,
    pub input_variables: HashMap<String, Value>,
    pub result_channel: String,
    pub log_channel: String,
    pub gateway_addr: String,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_id_raw = require("RUN_ID")?;
        let run_id = RunId::from_str(&run_id_raw).map_err(|e| ConfigError::Invalid("RUN_ID", e.to_string()))?;
        let runnable_kind = match require("RUNNABLE_KIND")?.as_str() {
            "agent" => RunnableKind::Agent,
            "team" => RunnableKind::Team,
            other => return Err(ConfigError::Invalid("RUNNABLE_KIND", other.to_string())),
        };
        let input_variables = match std::env::var("INPUT_VARIABLES") {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| ConfigError::Invalid("INPUT_VARIABLES", e.to_string()))?,
            Err(_) => HashMap::new(),
        };
        Ok(Self {
            run_id,
            runnable_kind,
            runnable_id: require("RUNNABLE_ID")?,
            input_variables,
            result_channel: require("RESULT_CHANNEL")?,
            log_channel: require("LOG_CHANNEL")?,
            gateway_addr: std::env::var("RUNCTL_STORE_ADDR")
                .or_else(|_| std::env::var("RUNCTL_BUS_ADDR"))
                .map_err(|_| ConfigError::Missing("RUNCTL_STORE_ADDR"))?,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}
