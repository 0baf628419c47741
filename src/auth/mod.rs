// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Signed-token authentication at the edge and identity propagation to the
//! services behind it.
//!
//! ## Auth Flow
//!
//! 1. The accounts service authenticates a user and issues an HS256 token
//!    (`sub` = email, `auth` = authorities, `iat`, `exp`).
//! 2. Clients send `Authorization: Bearer <token>` to the gateway.
//! 3. The gateway ([`edge::edge_trust_filter`]):
//!    - strips client-supplied `X-User-*` headers
//!    - lets open endpoints through
//!    - verifies the token and rejects failures with 401
//!    - asserts `X-User-Email` / `X-User-Roles` and forwards
//! 4. Each internal service runs, in order:
//!    - [`credential::credential_filter`]: verifies a bearer token locally
//!    - [`internal::internal_trust_filter`]: falls back to asserted headers
//!    - [`policy::authorization_filter`]: enforces per-endpoint requirements
//!
//! ## Security
//!
//! - One shared HMAC secret is the whole trust anchor (see [`keys`])
//! - Token failures are indistinguishable to callers
//! - Expiry is exact: no clock-skew leeway
//! - Asserted headers are unsigned (see [`assertion`])

pub mod assertion;
pub mod claims;
pub mod clock;
pub mod credential;
pub mod edge;
pub mod error;
pub mod extractor;
pub mod internal;
pub mod issuer;
pub mod keys;
pub mod policy;
pub mod roles;
pub mod verifier;

pub use claims::{IdentityContext, IdentitySource, TokenClaims};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use edge::{EdgeState, OpenEndpoints};
pub use error::{AuthError, TokenError};
pub use extractor::{AdminOnly, Auth};
pub use issuer::{IssuedToken, TokenIssuer};
pub use keys::{KeyHandle, KeyMaterial, KeyOrigin};
pub use policy::{AccessPolicy, Requirement};
pub use roles::{Authorities, Authority};
pub use verifier::TokenVerifier;
