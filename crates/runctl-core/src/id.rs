// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The run identifier.
//!
//! Runs need a globally unique 128-bit identifier with no coordination
//! between coordinator instances, so `RunId` wraps a v4 [`uuid::Uuid`]
//! rather than the nanoid scheme used elsewhere in this codebase for
//! shorter-lived, single-process identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Generate a fresh, globally unique run id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic id derived from an idempotency key, used by the
    /// coordinator to build a stable CSA launch-request id and by the
    /// scheduler to build a stable worker resource name.
    pub fn as_launch_token(&self) -> String {
        format!("run-{}", self.0.simple())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(any(test, feature = "test-support"))]
impl RunId {
    pub fn from_u128(v: u128) -> Self {
        Self(Uuid::from_u128(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn round_trips_through_string() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn launch_token_is_stable_for_same_id() {
        let id = RunId::new();
        assert_eq!(id.as_launch_token(), id.as_launch_token());
    }
}
