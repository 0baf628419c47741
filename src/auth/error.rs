// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Two layers:
//!
//! - [`TokenError`] is the tagged result of issuing or verifying a token. It
//!   keeps every distinction (bad structure, bad signature, expired, ...) so
//!   callers can log the precise cause.
//! - [`AuthError`] is what reaches the HTTP boundary. Every token failure
//!   collapses into one opaque `invalid_credential` response so a caller cannot
//!   tell a forged signature from an expired token.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Outcome of a failed token operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Token is not three base64url segments, or its claims do not decode.
    #[error("token is malformed")]
    Malformed,
    /// MAC over the signing input does not match the current key material.
    #[error("token signature is invalid")]
    InvalidSignature,
    /// `now >= exp`.
    #[error("token has expired")]
    Expired,
    /// Token subject differs from the expected identity.
    #[error("token subject does not match the expected identity")]
    SubjectMismatch,
    /// Signing key material was never initialized.
    #[error("signing key is unavailable")]
    KeyUnavailable,
}

impl TokenError {
    /// Short machine-readable cause, for logs only.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed",
            TokenError::InvalidSignature => "invalid_signature",
            TokenError::Expired => "expired",
            TokenError::SubjectMismatch => "subject_mismatch",
            TokenError::KeyUnavailable => "key_unavailable",
        }
    }
}

/// Authentication and authorization error returned to HTTP callers.
#[derive(Debug)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Authorization header is not `Bearer <token>`
    InvalidAuthHeader,
    /// Token failed verification; the cause is kept for logging only
    InvalidCredential(TokenError),
    /// No identity on a protected resource
    Unauthorized,
    /// Identity lacks the required authority
    Forbidden,
    /// Signing key material is not initialized
    KeyUnavailable,
    /// Request path has dot or empty segments
    InvalidPath,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::InvalidCredential(_) => "invalid_credential",
            AuthError::Unauthorized => "unauthorized",
            AuthError::Forbidden => "forbidden",
            AuthError::KeyUnavailable => "key_unavailable",
            AuthError::InvalidPath => "invalid_path",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidCredential(_)
            | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::KeyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::InvalidPath => StatusCode::BAD_REQUEST,
        }
    }

    /// Precise cause for logging. Never rendered into a response.
    pub fn log_reason(&self) -> &'static str {
        match self {
            AuthError::InvalidCredential(cause) => cause.reason(),
            other => other.error_code(),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::KeyUnavailable => AuthError::KeyUnavailable,
            other => AuthError::InvalidCredential(other),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::InvalidCredential(_) => write!(f, "Invalid or expired credential"),
            AuthError::Unauthorized => write!(f, "Authentication is required"),
            AuthError::Forbidden => write!(f, "Insufficient permissions for this operation"),
            AuthError::KeyUnavailable => write!(f, "Authentication is temporarily unavailable"),
            AuthError::InvalidPath => write!(f, "Invalid request path"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
