// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-memory `RunStore` fake, with no durability. Used by the
//! coordinator's and gateways' unit tests; never wired into the real
//! gateway binary.

use crate::{transition, RunFilter, RunStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use runctl_core::{Clock, Run, RunId, RunPatch, RunStatus, RunnableKind, SystemClock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub struct InMemoryRunStore<C: Clock = SystemClock> {
    runs: Mutex<HashMap<RunId, Run>>,
    clock: C,
}

impl InMemoryRunStore<SystemClock> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { runs: Mutex::new(HashMap::new()), clock: SystemClock })
    }
}

impl<C: Clock> InMemoryRunStore<C> {
    pub fn with_clock(clock: C) -> Arc<Self> {
        Arc::new(Self { runs: Mutex::new(HashMap::new()), clock })
    }
}

impl<C: Clock> Default for InMemoryRunStore<C>
where
    C: Default,
{
    fn default() -> Self {
        Self { runs: Mutex::new(HashMap::new()), clock: C::default() }
    }
}

#[async_trait]
impl<C: Clock> RunStore for InMemoryRunStore<C> {
    async fn insert_pending(
        &self,
        runnable_kind: RunnableKind,
        runnable_id: String,
        input_variables: HashMap<String, Value>,
    ) -> Result<RunId, StoreError> {
        let mut runs = self.runs.lock();
        let mut id = RunId::new();
        while runs.contains_key(&id) {
            id = RunId::new();
        }
        let run = Run::new_pending(id, runnable_kind, runnable_id, input_variables, self.clock.now());
        runs.insert(id, run);
        Ok(id)
    }

    async fn transition(
        &self,
        id: RunId,
        expected: RunStatus,
        next: RunStatus,
        patch: RunPatch,
    ) -> Result<bool, StoreError> {
        let mut runs = self.runs.lock();
        let run = runs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if run.status != expected || !expected.can_transition_to(next) {
            return Ok(false);
        }
        transition::apply(run, next, patch);
        Ok(true)
    }

    async fn fetch(&self, id: RunId) -> Result<Run, StoreError> {
        self.runs.lock().get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn list_active(&self) -> Result<Vec<Run>, StoreError> {
        Ok(self.runs.lock().values().filter(|r| !r.status.is_terminal()).cloned().collect())
    }

    async fn list(&self, filter: RunFilter) -> Result<Vec<Run>, StoreError> {
        Ok(self.runs.lock().values().filter(|r| filter.matches(r)).cloned().collect())
    }
}
