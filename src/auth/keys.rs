// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing key material.
//!
//! A single HMAC secret is the only trust anchor of the token space: every
//! issuer and every verifier must hold byte-identical material. It is loaded
//! once at startup and never mutated afterwards, so it is shared behind an
//! `Arc` and read without locking.
//!
//! ## Generated fallback
//!
//! When no secret is configured (or the configured one is shorter than
//! [`MIN_SECRET_LEN`] bytes) a random key is generated. That key exists only
//! in this process: tokens it signs are rejected by every other instance, and
//! all tokens become invalid on restart. It is only correct for a single
//! process that both issues and verifies. Multi-instance deployments must set
//! `JWT_SECRET` and should set `JWT_REQUIRE_SHARED_SECRET=true` so the
//! fallback is refused.

use std::sync::Arc;

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::error::TokenError;

/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Length of a generated fallback secret.
const GENERATED_SECRET_LEN: usize = 64;

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// Where the key material came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    /// Supplied through configuration; shareable across processes.
    Configured,
    /// Randomly generated at startup; valid in this process only.
    Generated,
}

/// Key loading failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("no signing secret configured")]
    Missing,
    #[error("signing secret is {len} bytes, at least {MIN_SECRET_LEN} are required")]
    TooShort { len: usize },
}

/// Symmetric signing key, immutable after construction.
pub struct KeyMaterial {
    secret: Vec<u8>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    origin: KeyOrigin,
}

impl KeyMaterial {
    /// Use a configured secret. Rejects secrets below [`MIN_SECRET_LEN`].
    pub fn from_secret(secret: &[u8]) -> Result<Self, KeyError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(KeyError::TooShort { len: secret.len() });
        }
        Ok(Self::build(secret.to_vec(), KeyOrigin::Configured))
    }

    /// Generate a random process-local key from the OS-seeded CSPRNG.
    pub fn generate() -> Self {
        let mut secret = vec![0u8; GENERATED_SECRET_LEN];
        rand::rng().fill_bytes(&mut secret);
        Self::build(secret, KeyOrigin::Generated)
    }

    /// Resolve the startup key.
    ///
    /// A usable configured secret always wins. Otherwise a random key is
    /// generated when `allow_generated` is set, and the configuration problem
    /// is returned as an error when it is not.
    pub fn load(secret: Option<&str>, allow_generated: bool) -> Result<Self, KeyError> {
        let configured = match secret.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Self::from_secret(s.as_bytes()),
            None => Err(KeyError::Missing),
        };

        match configured {
            Ok(key) => Ok(key),
            Err(err) if allow_generated => {
                tracing::warn!(
                    cause = %err,
                    "Generating a random signing key. Tokens will not verify on any other \
                     instance or after a restart; set JWT_SECRET for multi-instance deployments"
                );
                Ok(Self::generate())
            }
            Err(err) => Err(err),
        }
    }

    fn build(secret: Vec<u8>, origin: KeyOrigin) -> Self {
        Self {
            encoding: EncodingKey::from_secret(&secret),
            decoding: DecodingKey::from_secret(&secret),
            secret,
            origin,
        }
    }

    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }

    /// Short non-reversible identifier for logs and health output.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.secret);
        Base64UrlUnpadded::encode_string(&digest[..6])
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    pub(crate) fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::KeyUnavailable)
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("origin", &self.origin)
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

/// Process-wide handle to the key material, or the record that it failed to
/// initialize. Issuing and verifying through an unavailable handle fails with
/// [`TokenError::KeyUnavailable`] for that request only.
#[derive(Debug, Clone)]
pub struct KeyHandle(Option<Arc<KeyMaterial>>);

impl KeyHandle {
    pub fn new(key: KeyMaterial) -> Self {
        Self(Some(Arc::new(key)))
    }

    pub fn unavailable() -> Self {
        Self(None)
    }

    /// Build from a [`KeyMaterial::load`] result, logging the outcome.
    pub fn from_load(result: Result<KeyMaterial, KeyError>) -> Self {
        match result {
            Ok(key) => {
                tracing::info!(
                    origin = ?key.origin(),
                    fingerprint = %key.fingerprint(),
                    "Signing key loaded"
                );
                Self::new(key)
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    "Signing key unavailable; token issuance and verification will fail"
                );
                Self::unavailable()
            }
        }
    }

    pub fn get(&self) -> Result<&KeyMaterial, TokenError> {
        self.0.as_deref().ok_or(TokenError::KeyUnavailable)
    }

    pub fn is_available(&self) -> bool {
        self.0.is_some()
    }
}
