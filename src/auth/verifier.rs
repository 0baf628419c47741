// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token verification.
//!
//! Checks run in a fixed order and each maps to its own [`TokenError`]:
//!
//! 1. structure: three non-empty base64url segments → `Malformed`
//! 2. HMAC-SHA256 over `header.payload`, compared in constant time →
//!    `InvalidSignature`
//! 3. header/claims decoding (HS256 only) → `Malformed`; `now >= exp` →
//!    `Expired`
//! 4. optional subject match → `SubjectMismatch`
//!
//! Nothing in the header or payload is decoded before the MAC matches, so a
//! tampered token can only ever fail as a signature error.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::Mac;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, Validation};

use super::clock::{system_clock, SharedClock};
use super::keys::{KeyHandle, KeyMaterial};
use super::{TokenClaims, TokenError};

/// Validates tokens against the shared key material.
///
/// Holds no per-call state and is safe to share across concurrent requests.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: KeyHandle,
    clock: SharedClock,
}

impl TokenVerifier {
    pub fn new(keys: KeyHandle) -> Self {
        Self {
            keys,
            clock: system_clock(),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Verify a raw token and return its claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let (signing_input, signature) = split_token(token)?;
        let key = self.keys.get()?;

        verify_signature(key, signing_input, signature)?;
        let claims = decode_claims(token, key)?;

        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Verify a token that must belong to `expected_subject`.
    pub fn verify_for_subject(
        &self,
        token: &str,
        expected_subject: &str,
    ) -> Result<TokenClaims, TokenError> {
        let claims = self.verify(token)?;
        if claims.sub != expected_subject {
            return Err(TokenError::SubjectMismatch);
        }
        Ok(claims)
    }
}

/// Split into `(signing_input, signature)` after checking the compact shape.
fn split_token(token: &str) -> Result<(&str, &str), TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Malformed);
    }

    let well_formed = segments.iter().all(|segment| {
        !segment.is_empty()
            && segment
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    });
    if !well_formed {
        return Err(TokenError::Malformed);
    }

    let split_at = token.len() - segments[2].len() - 1;
    Ok((&token[..split_at], segments[2]))
}

fn verify_signature(key: &KeyMaterial, signing_input: &str, signature: &str) -> Result<(), TokenError> {
    let signature =
        Base64UrlUnpadded::decode_vec(signature).map_err(|_| TokenError::InvalidSignature)?;

    let mut mac = key.mac()?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::InvalidSignature)
}

fn decode_claims(token: &str, key: &KeyMaterial) -> Result<TokenClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<TokenClaims>(token, key.decoding_key(), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        })
}
