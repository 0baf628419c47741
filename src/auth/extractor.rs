// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the request identity.
//!
//! The trust filters attach an [`IdentityContext`] to the request; these
//! extractors only read it back. They never look at headers themselves.
//!
//! ```rust,ignore
//! async fn me(Auth(identity): Auth) -> impl IntoResponse {
//!     identity.subject
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, IdentityContext};

/// Requires an established identity.
pub struct Auth(pub IdentityContext);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityContext>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::Unauthorized)
    }
}

/// Requires an identity holding `ROLE_ADMIN`.
pub struct AdminOnly(pub IdentityContext);

impl<S> FromRequestParts<S> for AdminOnly
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(identity) = Auth::from_request_parts(parts, state).await?;

        if !identity.is_admin() {
            return Err(AuthError::Forbidden);
        }

        Ok(AdminOnly(identity))
    }
}
