// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Edge trust filter: the perimeter choke point.
//!
//! Installed as the outermost auth layer of the gateway, before any routing.
//! For each request:
//!
//! 1. client-supplied `X-User-*` headers are stripped and non-canonical
//!    paths (dot or empty segments) are refused with 400;
//! 2. paths on the open-endpoint allowlist pass through unauthenticated;
//! 3. otherwise a `Bearer` credential is required and verified;
//! 4. on success the identity is asserted downstream via headers and the
//!    credential itself is dropped unless forwarding is enabled;
//! 5. on failure the request ends here with 401 and is never forwarded.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{assertion, credential::bearer_credential, AuthError, IdentityContext, TokenVerifier};

/// Paths reachable without a credential by default.
pub const DEFAULT_OPEN_ENDPOINTS: &[&str] = &[
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/forgot-password",
    "/api/auth/reset-password",
    "/health",
];

/// Allowlist of path prefixes that skip authentication.
///
/// Matching is a case-sensitive prefix test; the first matching entry wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEndpoints(Vec<String>);

impl OpenEndpoints {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            prefixes
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        )
    }

    /// The first prefix matching `path`, if any.
    pub fn matching(&self, path: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|prefix| path.starts_with(prefix.as_str()))
            .map(String::as_str)
    }

    pub fn prefixes(&self) -> &[String] {
        &self.0
    }
}

impl Default for OpenEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN_ENDPOINTS.iter().copied())
    }
}

/// State for [`edge_trust_filter`].
#[derive(Clone)]
pub struct EdgeState {
    verifier: TokenVerifier,
    open_endpoints: Arc<OpenEndpoints>,
    forward_credential: bool,
}

impl EdgeState {
    pub fn new(verifier: TokenVerifier, open_endpoints: OpenEndpoints) -> Self {
        Self {
            verifier,
            open_endpoints: Arc::new(open_endpoints),
            forward_credential: false,
        }
    }

    /// Keep the original `Authorization` header on forwarded requests so that
    /// internal services can re-verify it.
    pub fn forward_credential(mut self, forward: bool) -> Self {
        self.forward_credential = forward;
        self
    }
}

/// Whether `path` is absolute with no empty, `.` or `..` segments.
///
/// Encoded dots count as dots. A single trailing slash is allowed.
pub fn is_canonical_path(path: &str) -> bool {
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    if rest.is_empty() {
        return !path.starts_with("//");
    }

    rest.split('/').all(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        !segment.is_empty() && decoded != "." && decoded != ".."
    })
}

/// Edge authentication middleware.
pub async fn edge_trust_filter(
    State(edge): State<EdgeState>,
    mut request: Request,
    next: Next,
) -> Response {
    assertion::strip(request.headers_mut());

    let path = request.uri().path().to_string();
    if !is_canonical_path(&path) {
        tracing::warn!(%path, "Rejected non-canonical path at edge");
        return AuthError::InvalidPath.into_response();
    }

    if let Some(prefix) = edge.open_endpoints.matching(&path) {
        tracing::debug!(%path, prefix, "Open endpoint, skipping authentication");
        if !edge.forward_credential {
            request.headers_mut().remove(AUTHORIZATION);
        }
        return next.run(request).await;
    }

    let verified = bearer_credential(request.headers())
        .and_then(|token| edge.verifier.verify(token).map_err(AuthError::from));

    let identity = match verified {
        Ok(claims) => IdentityContext::from_claims(claims),
        Err(err) => {
            tracing::warn!(%path, reason = err.log_reason(), "Rejected at edge");
            return err.into_response();
        }
    };

    if let Err(e) = assertion::assert_identity(request.headers_mut(), &identity) {
        tracing::warn!(%path, error = %e, "Identity cannot be carried in headers");
        return AuthError::Unauthorized.into_response();
    }

    if !edge.forward_credential {
        request.headers_mut().remove(AUTHORIZATION);
    }

    tracing::debug!(%path, subject = %identity.subject, "Edge authenticated request");
    request.extensions_mut().insert(identity);

    next.run(request).await
}
