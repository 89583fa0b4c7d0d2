// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

/// Tunables for the coordinator. All have defaults matching the
/// documented configuration surface; a deployment overrides them via the
/// gateway binary's layered config loader.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Wall-clock budget for `CSA.launch` retries before giving up and
    /// failing the run.
    pub launch_retry_budget: Duration,
    /// Initial backoff delay between launch retries; doubles each attempt.
    pub launch_retry_initial_backoff: Duration,
    /// How often `reap()` sweeps `list_active()`.
    pub reaper_period: Duration,
    /// How long an `Unknown` scheduler observation must persist before the
    /// reaper treats it as a crash.
    pub reaper_unknown_grace: Duration,
    pub worker_image: String,
    pub cpu_request: String,
    pub memory_request: String,
    pub cpu_limit: String,
    pub memory_limit: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            launch_retry_budget: Duration::from_secs(10),
            launch_retry_initial_backoff: Duration::from_millis(100),
            reaper_period: Duration::from_secs(30),
            reaper_unknown_grace: Duration::from_secs(60),
            worker_image: "runctl/worker:latest".to_string(),
            cpu_request: "100m".to_string(),
            memory_request: "128Mi".to_string(),
            cpu_limit: "500m".to_string(),
            memory_limit: "512Mi".to_string(),
        }
    }
}
