// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire envelopes carried on the message bus's two channel families.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Soft cap on a single chunk envelope's serialized size; larger chunks are
/// split by the worker before publishing.
pub const MAX_CHUNK_BYTES: usize = 1024 * 1024;

/// Soft cap on the worker's in-memory aggregated output; beyond this the
/// worker spills to an external store and records a reference instead.
pub const MAX_AGGREGATE_BYTES: usize = 64 * 1024 * 1024;

/// One message on a `run_results:{id}` channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultEnvelope {
    Chunk { payload: Value },
    End {
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ResultEnvelope {
    pub fn end_ok() -> Self {
        Self::End { error: None }
    }

    pub fn end_error(message: impl Into<String>) -> Self {
        Self::End { error: Some(message.into()) }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::End { .. })
    }
}

/// One message on a `run_logs:{id}` channel: a single plain-text log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine(pub String);

impl From<String> for LogLine {
    fn from(value: String) -> Self {
        Self(value)
    }
}
