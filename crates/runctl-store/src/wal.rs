// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable `RunStore`: an append-only write-ahead log of [`RunEvent`]s on
//! disk, replayed into an in-memory materialized map at startup. Every
//! mutation appends a record and `fsync`s before the in-memory map is
//! updated and before the call returns.

use crate::{transition, RunFilter, RunStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use runctl_core::{Clock, Run, RunId, RunPatch, RunStatus, RunnableKind, SystemClock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One durable fact appended to the log. State is always derived by
/// replaying these in order, never written to directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
enum RunEvent {
    Inserted { run: Run },
    Transitioned { id: RunId, expected: RunStatus, next: RunStatus, patch: PatchEvent },
}

/// `RunPatch` is not `Serialize` by design (it's a transient CAS argument);
/// this is its durable shadow.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PatchEvent {
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    ended_at: Option<chrono::DateTime<chrono::Utc>>,
    worker_handle: Option<String>,
    output_data: Option<Value>,
    error_message: Option<String>,
}

impl From<&RunPatch> for PatchEvent {
    fn from(p: &RunPatch) -> Self {
        Self {
            started_at: p.started_at,
            ended_at: p.ended_at,
            worker_handle: p.worker_handle.clone(),
            output_data: p.output_data.clone(),
            error_message: p.error_message.clone(),
        }
    }
}

impl From<PatchEvent> for RunPatch {
    fn from(p: PatchEvent) -> Self {
        Self {
            started_at: p.started_at,
            ended_at: p.ended_at,
            worker_handle: p.worker_handle,
            output_data: p.output_data,
            error_message: p.error_message,
        }
    }
}

struct Inner {
    runs: HashMap<RunId, Run>,
    file: File,
}

/// WAL-backed run store. One log file per daemon instance; crash recovery
/// replays the whole file at [`WalRunStore::open`].
pub struct WalRunStore<C: Clock = SystemClock> {
    inner: Mutex<Inner>,
    clock: C,
}

impl WalRunStore<SystemClock> {
    pub fn open(path: impl AsRef<Path>) -> Result<Arc<Self>, StoreError> {
        Self::open_with_clock(path, SystemClock)
    }
}

impl<C: Clock> WalRunStore<C> {
    pub fn open_with_clock(path: impl AsRef<Path>, clock: C) -> Result<Arc<Self>, StoreError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let runs = if path.exists() { replay(&path)? } else { HashMap::new() };
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Arc::new(Self { inner: Mutex::new(Inner { runs, file }), clock }))
    }

    fn append(inner: &mut Inner, event: &RunEvent) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        inner.file.write_all(&line)?;
        inner.file.sync_all()?;
        Ok(())
    }
}

fn replay(path: &Path) -> Result<HashMap<RunId, Run>, StoreError> {
    let file = File::open(path)?;
    let mut runs = HashMap::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: RunEvent = serde_json::from_str(&line)?;
        match event {
            RunEvent::Inserted { run } => {
                runs.insert(run.id, run);
            }
            RunEvent::Transitioned { id, expected, next, patch } => {
                if let Some(run) = runs.get_mut(&id) {
                    if run.status == expected {
                        transition::apply(run, next, patch.into());
                    }
                }
            }
        }
    }
    Ok(runs)
}

#[async_trait]
impl<C: Clock> RunStore for WalRunStore<C> {
    async fn insert_pending(
        &self,
        runnable_kind: RunnableKind,
        runnable_id: String,
        input_variables: HashMap<String, Value>,
    ) -> Result<RunId, StoreError> {
        let mut inner = self.inner.lock();
        let mut id = RunId::new();
        while inner.runs.contains_key(&id) {
            id = RunId::new();
        }
        let run = Run::new_pending(id, runnable_kind, runnable_id, input_variables, self.clock.now());
        Self::append(&mut inner, &RunEvent::Inserted { run: run.clone() })?;
        inner.runs.insert(id, run);
        Ok(id)
    }

    async fn transition(
        &self,
        id: RunId,
        expected: RunStatus,
        next: RunStatus,
        patch: RunPatch,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        let current = inner.runs.get(&id).ok_or(StoreError::NotFound(id))?.status;
        if current != expected || !expected.can_transition_to(next) {
            return Ok(false);
        }
        let event = RunEvent::Transitioned { id, expected, next, patch: PatchEvent::from(&patch) };
        Self::append(&mut inner, &event)?;
        let run = inner.runs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        transition::apply(run, next, patch);
        Ok(true)
    }

    async fn fetch(&self, id: RunId) -> Result<Run, StoreError> {
        self.inner.lock().runs.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn list_active(&self) -> Result<Vec<Run>, StoreError> {
        Ok(self.inner.lock().runs.values().filter(|r| !r.status.is_terminal()).cloned().collect())
    }

    async fn list(&self, filter: RunFilter) -> Result<Vec<Run>, StoreError> {
        Ok(self.inner.lock().runs.values().filter(|r| filter.matches(r)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.wal");

        let id = {
            let store = WalRunStore::open(&path).unwrap();
            let id = store
                .insert_pending(RunnableKind::Agent, "a1".into(), HashMap::new())
                .await
                .unwrap();
            store
                .transition(id, RunStatus::Pending, RunStatus::Running, RunPatch::default())
                .await
                .unwrap();
            id
        };

        let reopened = WalRunStore::open(&path).unwrap();
        let run = reopened.fetch(id).await.unwrap();
        assert_eq!(run.status, RunStatus::Running);
    }

    #[tokio::test]
    async fn transition_is_rejected_if_status_already_moved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.wal");
        let store = WalRunStore::open(&path).unwrap();
        let id = store
            .insert_pending(RunnableKind::Agent, "a1".into(), HashMap::new())
            .await
            .unwrap();
        store
            .transition(id, RunStatus::Pending, RunStatus::Failed, RunPatch::default())
            .await
            .unwrap();
        let stale = store
            .transition(id, RunStatus::Pending, RunStatus::Running, RunPatch::default())
            .await
            .unwrap();
        assert!(!stale);
    }
}
