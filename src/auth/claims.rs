// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the per-request identity context.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::{Authorities, Authority};

/// Claims carried in every token.
///
/// The authorities claim is written as `auth`. `roles` is accepted as an
/// alias, and both accept either a JSON array or a comma-delimited string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user email)
    pub sub: String,

    /// Granted authorities
    #[serde(default, alias = "roles")]
    pub auth: Authorities,

    /// Issued at (Unix seconds)
    pub iat: i64,

    /// Expiration (Unix seconds)
    pub exp: i64,
}

/// How the identity of a request was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// A bearer token was verified by this process.
    Credential,
    /// Asserted by the edge through unsigned transport headers.
    EdgeAssertion,
}

/// Authenticated identity of the current request.
///
/// Built by one of the trust filters, attached to the request it belongs to
/// and dropped with it. Both filters produce the same shape, so authorization
/// never needs to know which one ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IdentityContext {
    /// Authenticated subject (email)
    pub subject: String,

    /// Authorities held by the subject
    pub authorities: Authorities,

    /// Which filter established the identity
    pub source: IdentitySource,

    /// Token expiration (Unix seconds), when a token was verified locally
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl IdentityContext {
    /// Create from verified token claims.
    pub fn from_claims(claims: TokenClaims) -> Self {
        Self {
            subject: claims.sub,
            authorities: claims.auth,
            source: IdentitySource::Credential,
            expires_at: Some(claims.exp),
        }
    }

    /// Create from edge-asserted metadata.
    pub fn from_assertion(subject: impl Into<String>, roles: &str) -> Self {
        Self {
            subject: subject.into(),
            authorities: Authorities::parse_delimited(roles),
            source: IdentitySource::EdgeAssertion,
            expires_at: None,
        }
    }

    /// Exact membership test.
    pub fn has_authority(&self, name: &str) -> bool {
        self.authorities.contains(name)
    }

    pub fn is_admin(&self) -> bool {
        self.has_authority(Authority::ADMIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> TokenClaims {
        TokenClaims {
            sub: "u@x.com".to_string(),
            auth: Authorities::new([Authority::USER, Authority::ADMIN]),
            iat: 1_700_000_000,
            exp: 1_700_003_600,
        }
    }

    #[test]
    fn from_claims_keeps_subject_and_authorities() {
        let identity = IdentityContext::from_claims(sample_claims());
        assert_eq!(identity.subject, "u@x.com");
        assert!(identity.has_authority("ROLE_USER"));
        assert!(identity.is_admin());
        assert_eq!(identity.source, IdentitySource::Credential);
        assert_eq!(identity.expires_at, Some(1_700_003_600));
    }

    #[test]
    fn from_assertion_trims_roles() {
        let identity = IdentityContext::from_assertion("u@x.com", "ROLE_USER , ROLE_ADMIN");
        assert_eq!(identity.authorities.to_strings(), vec!["ROLE_USER", "ROLE_ADMIN"]);
        assert_eq!(identity.source, IdentitySource::EdgeAssertion);
        assert!(identity.expires_at.is_none());
    }

    #[test]
    fn claims_accept_roles_alias_as_string() {
        let claims: TokenClaims = serde_json::from_str(
            r#"{"sub":"u@x.com","roles":"ROLE_USER,ROLE_ADMIN","iat":1,"exp":2}"#,
        )
        .unwrap();
        assert_eq!(claims.auth.to_strings(), vec!["ROLE_USER", "ROLE_ADMIN"]);
    }

    #[test]
    fn claims_serialize_authorities_as_auth_list() {
        let json = serde_json::to_value(sample_claims()).unwrap();
        assert_eq!(json["auth"], serde_json::json!(["ROLE_USER", "ROLE_ADMIN"]));
    }
}
