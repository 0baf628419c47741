// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Trust assertion metadata: identity handed from the edge to internal
//! services through plain request headers.
//!
//! ## Trust boundary
//!
//! These headers carry **no cryptographic proof**. An internal service that
//! honours them is trusting whoever can reach it. That is only sound while
//! internal services are reachable exclusively through the edge, which is a
//! property of the network, not of this protocol. Two safeguards live in code:
//!
//! - the edge strips any client-supplied copies before it asserts its own,
//!   on every request including open endpoints;
//! - internal services run the credential filter first, so a caller that
//!   bypasses the edge with a bearer token is still verified cryptographically.
//!
//! Signing the assertion for inter-service verification is not done.

use axum::http::{
    header::{HeaderName, InvalidHeaderValue},
    HeaderMap, HeaderValue,
};

use super::IdentityContext;

/// Asserted subject.
pub const USER_EMAIL_HEADER: HeaderName = HeaderName::from_static("x-user-email");
/// Asserted authorities, comma-joined.
pub const USER_ROLES_HEADER: HeaderName = HeaderName::from_static("x-user-roles");

/// Remove any assertion headers from a request.
pub fn strip(headers: &mut HeaderMap) {
    headers.remove(USER_EMAIL_HEADER);
    headers.remove(USER_ROLES_HEADER);
}

/// Replace the assertion headers with the given identity.
pub fn assert_identity(
    headers: &mut HeaderMap,
    identity: &IdentityContext,
) -> Result<(), InvalidHeaderValue> {
    let email = HeaderValue::from_str(&identity.subject)?;
    let roles = HeaderValue::from_str(&identity.authorities.join())?;
    headers.insert(USER_EMAIL_HEADER, email);
    headers.insert(USER_ROLES_HEADER, roles);
    Ok(())
}

/// Read an asserted identity. Both headers must be present and the subject
/// non-empty; the roles list may be empty.
pub fn read_identity(headers: &HeaderMap) -> Option<IdentityContext> {
    let email = headers.get(USER_EMAIL_HEADER)?.to_str().ok()?.trim();
    let roles = headers.get(USER_ROLES_HEADER)?.to_str().ok()?;

    if email.is_empty() {
        return None;
    }

    Some(IdentityContext::from_assertion(email, roles))
}
