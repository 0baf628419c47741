// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token issuance.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, Header};

use super::clock::{system_clock, SharedClock};
use super::keys::KeyHandle;
use super::{Authorities, TokenClaims, TokenError};

/// Default token lifetime (24 hours).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::hours(24);

/// Mints HS256 tokens for verified identities.
///
/// Stateless apart from the shared key and clock; clone freely.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: KeyHandle,
    ttl: Duration,
    clock: SharedClock,
}

impl TokenIssuer {
    pub fn new(keys: KeyHandle, ttl: Duration) -> Self {
        Self {
            keys,
            ttl,
            clock: system_clock(),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign `{sub, auth, iat = now, exp = now + ttl}`.
    pub fn issue(&self, subject: &str, authorities: &Authorities) -> Result<String, TokenError> {
        self.issue_token(subject, authorities).map(|issued| issued.token)
    }

    /// Like [`issue`](Self::issue), also returning the expiration.
    pub fn issue_token(
        &self,
        subject: &str,
        authorities: &Authorities,
    ) -> Result<IssuedToken, TokenError> {
        let key = self.keys.get()?;

        let issued_at = self.clock.now();
        let expires_at = issued_at + self.ttl;
        let claims = TokenClaims {
            sub: subject.to_string(),
            auth: authorities.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, key.encoding_key()).map_err(
            |e| {
                tracing::error!(error = %e, "Failed to sign token");
                TokenError::KeyUnavailable
            },
        )?;

        Ok(IssuedToken { token, expires_at })
    }
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::keys::KeyMaterial;
    use crate::auth::Authority;

    #[test]
    fn issued_token_has_three_segments() {
        let issuer = TokenIssuer::new(KeyHandle::new(KeyMaterial::generate()), DEFAULT_TOKEN_TTL);
        let token = issuer
            .issue("u@x.com", &Authorities::new([Authority::USER]))
            .unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn issue_without_key_fails() {
        let issuer = TokenIssuer::new(KeyHandle::unavailable(), DEFAULT_TOKEN_TTL);
        let err = issuer.issue("u@x.com", &Authorities::default()).unwrap_err();
        assert_eq!(err, TokenError::KeyUnavailable);
    }

    #[test]
    fn issue_token_reports_expiry_from_clock() {
        use crate::auth::clock::ManualClock;
        use chrono::TimeZone;
        use std::sync::Arc;

        let start = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let issuer = TokenIssuer::new(KeyHandle::new(KeyMaterial::generate()), Duration::hours(1))
            .with_clock(Arc::new(ManualClock::new(start)));

        let issued = issuer.issue_token("u@x.com", &Authorities::default()).unwrap();
        assert_eq!(issued.expires_at, start + Duration::hours(1));
    }
}
