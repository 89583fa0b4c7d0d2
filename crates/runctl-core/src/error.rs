// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error vocabulary.
//!
//! Each component crate defines its own `thiserror` enum for its internal
//! failure modes; [`UpstreamError`] is the shared shape components use when
//! calling out to one another, so the coordinator's retry logic can match on
//! `Transient` vs `Permanent` without depending on every downstream crate's
//! concrete error type.

use thiserror::Error;

/// A categorized failure from a call to an external or adjacent component
/// (the cluster scheduler, the message bus, the store).
#[derive(Debug, Error, Clone)]
pub enum UpstreamError {
    /// Worth retrying with backoff: the collaborator is momentarily
    /// unavailable or overloaded.
    #[error("transient upstream failure: {0}")]
    Transient(String),

    /// Not worth retrying: misconfiguration, auth failure, or a retry
    /// budget already exhausted upstream.
    #[error("permanent upstream failure: {0}")]
    Permanent(String),
}

impl UpstreamError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
