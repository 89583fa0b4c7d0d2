// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runnable abstraction: this crate never assumes agents and teams
//! share a shape, and never walks their configuration graph itself — both
//! are resolved and executed entirely behind these two traits.

use async_trait::async_trait;
use runctl_core::RunnableKind;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum RunnableError {
    #[error("runnable not found: {0}")]
    NotFound(String),
    #[error("runnable execution failed: {0}")]
    ExecutionFailed(String),
}

/// A resolved, executable unit of work. Implementors drive the actual AI
/// logic, entirely out of scope for this subsystem; the stub
/// implementations below exist only so the harness is exercisable.
#[async_trait]
pub trait Runnable: Send + Sync {
    /// Execute to completion, sending each output chunk on `chunks` as it
    /// becomes available, and returning the final aggregated output.
    async fn run(
        &self,
        input_variables: &HashMap<String, Value>,
        chunks: mpsc::Sender<Value>,
    ) -> Result<Value, RunnableError>;
}

/// Resolves an opaque `runnable_id` into an executable [`Runnable`].
/// Delegates to the external agent/team configuration service — modeled
/// here purely as a trait boundary, matching how agent definitions are
/// resolved from a runbook rather than hardcoded in the engine.
#[async_trait]
pub trait RunnableResolver: Send + Sync {
    async fn resolve(
        &self,
        kind: RunnableKind,
        runnable_id: &str,
    ) -> Result<Box<dyn Runnable>, RunnableError>;
}

/// Stub agent runnable: echoes its `message` input variable back as a
/// single chunk. Stands in for the real agent executor, which is out of
/// scope here.
pub struct StubRunnable;

#[async_trait]
impl Runnable for StubRunnable {
    async fn run(
        &self,
        input_variables: &HashMap<String, Value>,
        chunks: mpsc::Sender<Value>,
    ) -> Result<Value, RunnableError> {
        let message = input_variables.get("message").cloned().unwrap_or(Value::Null);
        let _ = chunks.send(message.clone()).await;
        Ok(message)
    }
}

/// Resolver used by the shipped worker binary: any `runnable_id` resolves
/// to [`StubRunnable`], since resolving real agent/team configuration is an
/// external collaborator's responsibility.
pub struct StubResolver;

#[async_trait]
impl RunnableResolver for StubResolver {
    async fn resolve(
        &self,
        _kind: RunnableKind,
        _runnable_id: &str,
    ) -> Result<Box<dyn Runnable>, RunnableError> {
        Ok(Box::new(StubRunnable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_runnable_echoes_message_as_a_single_chunk() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut input = HashMap::new();
        input.insert("message".to_string(), Value::String("hi".into()));
        let output = StubRunnable.run(&input, tx).await.unwrap();
        assert_eq!(output, Value::String("hi".into()));
        assert_eq!(rx.recv().await.unwrap(), Value::String("hi".into()));
    }
}
