// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use runctl_core::RunId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("run not found: {0}")]
    NotFound(RunId),

    #[error("run id collision: {0}")]
    Conflict(RunId),

    #[error("wal io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wal serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
