// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token verification. Verification logic itself is delegated to an
//! external collaborator — this crate only knows how to extract the token
//! from a request and reject it with a 401 before any handler runs.

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

#[async_trait]
pub trait TokenVerifier: Send + Sync + 'static {
    async fn verify(&self, token: &str) -> bool;
}

/// Accepts exactly one configured token. Suitable for single-tenant
/// deployments and local development; multi-tenant verification is an
/// external collaborator's job via a different `TokenVerifier`.
pub struct StaticTokenVerifier {
    token: String,
}

impl StaticTokenVerifier {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> bool {
        token == self.token
    }
}

/// Accepts any token. Used when no `auth_token` is configured, i.e. local
/// development against the fake scheduler.
pub struct NoopVerifier;

#[async_trait]
impl TokenVerifier for NoopVerifier {
    async fn verify(&self, _token: &str) -> bool {
        true
    }
}

pub async fn require_bearer_token(
    State(verifier): State<Arc<dyn TokenVerifier>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(t) if verifier.verify(t).await => Ok(next.run(request).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_verifier_accepts_only_the_configured_token() {
        let verifier = StaticTokenVerifier::new("secret");
        assert!(verifier.verify("secret").await);
        assert!(!verifier.verify("wrong").await);
    }

    #[tokio::test]
    async fn noop_verifier_accepts_anything() {
        let verifier = NoopVerifier;
        assert!(verifier.verify("anything").await);
    }
}
