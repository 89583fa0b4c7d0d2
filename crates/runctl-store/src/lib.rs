// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! runctl-store: durable run records.
//!
//! [`RunStore`] is the sole source of truth for run status. All mutation
//! goes through [`RunStore::transition`], a compare-and-set keyed on the
//! caller's expected current status, so two writers racing to finalize the
//! same run (a worker reporting completion and the reaper declaring it
//! crashed) can never both win.

mod error;
mod filter;
mod memory;
mod transition;
mod wal;

pub use error::StoreError;
pub use filter::RunFilter;
pub use memory::InMemoryRunStore;
pub use wal::WalRunStore;

use async_trait::async_trait;
use runctl_core::{Run, RunId, RunPatch, RunStatus, RunnableKind};
use serde_json::Value;
use std::collections::HashMap;

/// Durable, transactional persistence of run records.
#[async_trait]
pub trait RunStore: Send + Sync + 'static {
    /// Insert a fresh `pending` record, returning its id.
    async fn insert_pending(
        &self,
        runnable_kind: RunnableKind,
        runnable_id: String,
        input_variables: HashMap<String, Value>,
    ) -> Result<RunId, StoreError>;

    /// Compare-and-set: apply `patch` and move to `next` only if the
    /// record's current status is exactly `expected`. Returns `true` iff
    /// the transition was applied.
    async fn transition(
        &self,
        id: RunId,
        expected: RunStatus,
        next: RunStatus,
        patch: RunPatch,
    ) -> Result<bool, StoreError>;

    async fn fetch(&self, id: RunId) -> Result<Run, StoreError>;

    /// All runs with non-terminal status, as of a single consistent
    /// snapshot. Used by the reaper.
    async fn list_active(&self) -> Result<Vec<Run>, StoreError>;

    /// All runs matching `filter`.
    async fn list(&self, filter: RunFilter) -> Result<Vec<Run>, StoreError>;
}
