// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered configuration: built-in defaults, then an optional TOML file,
//! then `RUNCTL_*` environment variable overrides. Each layer only
//! supplies the fields it has an opinion about.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(String, std::io::Error),
    #[error("failed to parse config file {0}: {1}")]
    Parse(String, toml::de::Error),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub store_path: String,
    pub log_format: LogFormat,
    pub result_channel_buffer: usize,
    pub client_send_buffer: usize,
    pub launch_retry_budget: Duration,
    pub reaper_period: Duration,
    pub reaper_unknown_grace: Duration,
    pub worker_image: String,
    pub cpu_request: String,
    pub memory_request: String,
    pub cpu_limit: String,
    pub memory_limit: String,
    pub cleanup_completed_age: Duration,
    pub cleanup_sweep_period: Duration,
    pub auth_token: Option<String>,
    pub use_fake_scheduler: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            store_path: "./runctl-data/runs.log".to_string(),
            log_format: LogFormat::Pretty,
            result_channel_buffer: 1024,
            client_send_buffer: 64,
            launch_retry_budget: Duration::from_secs(10),
            reaper_period: Duration::from_secs(30),
            reaper_unknown_grace: Duration::from_secs(60),
            worker_image: "runctl/worker:latest".to_string(),
            cpu_request: "100m".to_string(),
            memory_request: "128Mi".to_string(),
            cpu_limit: "500m".to_string(),
            memory_limit: "512Mi".to_string(),
            cleanup_completed_age: Duration::from_secs(600),
            cleanup_sweep_period: Duration::from_secs(600),
            auth_token: None,
            use_fake_scheduler: false,
        }
    }
}

/// The TOML file shape. Every field optional: the file only overrides
/// what it names.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind_addr: Option<String>,
    store_path: Option<String>,
    log_format: Option<String>,
    result_channel_buffer: Option<usize>,
    client_send_buffer: Option<usize>,
    launch_retry_budget_secs: Option<u64>,
    reaper_period_secs: Option<u64>,
    reaper_unknown_grace_secs: Option<u64>,
    worker_image: Option<String>,
    cpu_request: Option<String>,
    memory_request: Option<String>,
    cpu_limit: Option<String>,
    memory_limit: Option<String>,
    cleanup_completed_age_secs: Option<u64>,
    cleanup_sweep_period_secs: Option<u64>,
}

impl GatewayConfig {
    /// Load defaults, apply an optional TOML file, then apply `RUNCTL_*`
    /// environment overrides.
    pub fn load(file_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = file_path {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::Read(path.display().to_string(), e))?;
            let file: FileConfig =
                toml::from_str(&raw).map_err(|e| ConfigError::Parse(path.display().to_string(), e))?;
            config.apply_file(file)?;
        }

        config.apply_env()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) -> Result<(), ConfigError> {
        if let Some(v) = file.bind_addr {
            self.bind_addr = v;
        }
        if let Some(v) = file.store_path {
            self.store_path = v;
        }
        if let Some(v) = file.log_format {
            self.log_format = parse_log_format(&v)?;
        }
        if let Some(v) = file.result_channel_buffer {
            self.result_channel_buffer = v;
        }
        if let Some(v) = file.client_send_buffer {
            self.client_send_buffer = v;
        }
        if let Some(v) = file.launch_retry_budget_secs {
            self.launch_retry_budget = Duration::from_secs(v);
        }
        if let Some(v) = file.reaper_period_secs {
            self.reaper_period = Duration::from_secs(v);
        }
        if let Some(v) = file.reaper_unknown_grace_secs {
            self.reaper_unknown_grace = Duration::from_secs(v);
        }
        if let Some(v) = file.worker_image {
            self.worker_image = v;
        }
        if let Some(v) = file.cpu_request {
            self.cpu_request = v;
        }
        if let Some(v) = file.memory_request {
            self.memory_request = v;
        }
        if let Some(v) = file.cpu_limit {
            self.cpu_limit = v;
        }
        if let Some(v) = file.memory_limit {
            self.memory_limit = v;
        }
        if let Some(v) = file.cleanup_completed_age_secs {
            self.cleanup_completed_age = Duration::from_secs(v);
        }
        if let Some(v) = file.cleanup_sweep_period_secs {
            self.cleanup_sweep_period = Duration::from_secs(v);
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = std::env::var("RUNCTL_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Ok(v) = std::env::var("RUNCTL_STORE_PATH") {
            self.store_path = v;
        }
        if let Ok(v) = std::env::var("RUNCTL_LOG_FORMAT") {
            self.log_format = parse_log_format(&v)?;
        }
        if let Some(v) = env_u64("RUNCTL_LAUNCH_RETRY_BUDGET_SECS")? {
            self.launch_retry_budget = Duration::from_secs(v);
        }
        if let Some(v) = env_u64("RUNCTL_REAPER_PERIOD_SECS")? {
            self.reaper_period = Duration::from_secs(v);
        }
        if let Some(v) = env_u64("RUNCTL_REAPER_UNKNOWN_GRACE_SECS")? {
            self.reaper_unknown_grace = Duration::from_secs(v);
        }
        if let Ok(v) = std::env::var("RUNCTL_WORKER_IMAGE") {
            self.worker_image = v;
        }
        if let Some(v) = env_u64("RUNCTL_CLEANUP_COMPLETED_AGE_SECS")? {
            self.cleanup_completed_age = Duration::from_secs(v);
        }
        if let Some(v) = env_u64("RUNCTL_CLEANUP_SWEEP_PERIOD_SECS")? {
            self.cleanup_sweep_period = Duration::from_secs(v);
        }
        self.auth_token = std::env::var("RUNCTL_AUTH_TOKEN").ok().filter(|s| !s.is_empty());
        self.use_fake_scheduler = std::env::var("RUNCTL_FAKE_SCHEDULER").is_ok();
        Ok(())
    }
}

fn env_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(name) {
        Ok(v) => v.parse().map(Some).map_err(|_| ConfigError::Invalid(name, v)),
        Err(_) => Ok(None),
    }
}

fn parse_log_format(v: &str) -> Result<LogFormat, ConfigError> {
    match v {
        "pretty" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        other => Err(ConfigError::Invalid("log_format", other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = GatewayConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.result_channel_buffer, 1024);
        assert_eq!(config.client_send_buffer, 64);
    }

    #[test]
    fn file_overrides_layer_on_top_of_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runctl.toml");
        std::fs::write(&path, "worker_image = \"custom:latest\"\nreaper_period_secs = 5\n").unwrap();
        let config = GatewayConfig::load(Some(&path)).unwrap();
        assert_eq!(config.worker_image, "custom:latest");
        assert_eq!(config.reaper_period, Duration::from_secs(5));
        assert_eq!(config.bind_addr, "0.0.0.0:8080"); // untouched default
    }
}
