// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer credential parsing and the per-service credential filter.
//!
//! The credential filter is the defense-in-depth half of the trust model: it
//! runs inside every internal service, ahead of the internal trust filter, and
//! verifies a raw bearer token locally. If the edge is bypassed or
//! misconfigured, callers are still authenticated from the original token
//! instead of unsigned metadata alone.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, IdentityContext, TokenVerifier};

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The scheme is matched exactly. Anything but a single non-empty token after
/// it is rejected.
pub fn bearer_credential(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::InvalidAuthHeader)?;

    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token)
}

/// Verify a bearer token locally, if one is presented.
///
/// - valid token: attach an [`IdentityContext`] and continue
/// - invalid token: reject with 401; a presented credential that fails never
///   falls through to header-asserted identity
/// - no bearer token: continue untouched and let the next filter decide
pub async fn credential_filter(
    State(verifier): State<TokenVerifier>,
    mut request: Request,
    next: Next,
) -> Response {
    let outcome = match bearer_credential(request.headers()) {
        Ok(token) => Some(verifier.verify(token)),
        Err(AuthError::MissingAuthHeader) => None,
        Err(e) => {
            tracing::debug!(reason = e.log_reason(), "Ignoring non-bearer authorization header");
            None
        }
    };

    match outcome {
        Some(Ok(claims)) => {
            let identity = IdentityContext::from_claims(claims);
            tracing::debug!(subject = %identity.subject, "Credential verified locally");
            request.extensions_mut().insert(identity);
        }
        Some(Err(e)) => {
            let err = AuthError::from(e);
            tracing::warn!(
                path = %request.uri().path(),
                reason = err.log_reason(),
                "Rejected bearer credential"
            );
            return err.into_response();
        }
        None => {}
    }

    next.run(request).await
}
