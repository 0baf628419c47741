// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Internal trust filter: builds the identity from edge-asserted headers.
//!
//! No cryptography happens here. See [`super::assertion`] for the trust
//! boundary this relies on.

use axum::{extract::Request, middleware::Next, response::Response};

use super::{assertion, IdentityContext};

/// Attach an [`IdentityContext`] built from `X-User-Email`/`X-User-Roles`.
///
/// An identity already established by the credential filter is kept as is.
/// Without both headers the request continues unauthenticated and the
/// authorization layer decides.
pub async fn internal_trust_filter(mut request: Request, next: Next) -> Response {
    if request.extensions().get::<IdentityContext>().is_none() {
        match assertion::read_identity(request.headers()) {
            Some(identity) => {
                tracing::debug!(
                    subject = %identity.subject,
                    roles = %identity.authorities.join(),
                    "Using edge-asserted identity"
                );
                request.extensions_mut().insert(identity);
            }
            None => tracing::debug!("No edge trust assertion on request"),
        }
    }

    next.run(request).await
}
