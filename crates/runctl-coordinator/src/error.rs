// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use runctl_core::RunId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("run not found: {0}")]
    NotFound(RunId),

    #[error("store error: {0}")]
    Store(#[from] runctl_store::StoreError),

    #[error("worker launch failed: {0}")]
    LaunchFailed(String),
}
