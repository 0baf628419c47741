// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password reset tokens.
//!
//! A reset token is a random single-use secret stored on the user record.
//!
//! - `initiate` replaces any pending token of the user, so only the newest
//!   one is ever valid.
//! - `consume` removes the token before anything else is checked. An expired
//!   or otherwise failed attempt therefore burns the token as well.
//! - Email delivery happens after the token is persisted, in a detached task;
//!   a slow or failing mailer never changes what was stored.

use std::{sync::Arc, time::Duration as StdDuration};

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use thiserror::Error;
use url::Url;

use super::mailer::{dispatch_password_reset, Mailer, DEFAULT_MAIL_TIMEOUT};
use super::password::PasswordHasher;
use super::store::{ResetToken, StoreError, UserStore};
use crate::auth::clock::{system_clock, SharedClock};

/// Default reset token lifetime (1 hour).
pub const DEFAULT_RESET_TTL: Duration = Duration::hours(1);

/// Random bytes per token.
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum ResetError {
    /// No account for the email. Callers must not reveal this.
    #[error("user not found")]
    NotFound,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("token has expired")]
    Expired,
    #[error("password reset failed: {0}")]
    Internal(String),
}

impl From<StoreError> for ResetError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ResetError::NotFound,
            other => ResetError::Internal(other.to_string()),
        }
    }
}

/// Issues and redeems password reset tokens.
#[derive(Clone)]
pub struct ResetTokenManager {
    store: Arc<dyn UserStore>,
    passwords: PasswordHasher,
    mailer: Arc<dyn Mailer>,
    link_base: Url,
    ttl: Duration,
    mail_timeout: StdDuration,
    clock: SharedClock,
}

impl ResetTokenManager {
    pub fn new(
        store: Arc<dyn UserStore>,
        passwords: PasswordHasher,
        mailer: Arc<dyn Mailer>,
        link_base: Url,
    ) -> Self {
        Self {
            store,
            passwords,
            mailer,
            link_base,
            ttl: DEFAULT_RESET_TTL,
            mail_timeout: DEFAULT_MAIL_TIMEOUT,
            clock: system_clock(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_mail_timeout(mut self, timeout: StdDuration) -> Self {
        self.mail_timeout = timeout;
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Start a reset for `email` and return the token expiry.
    pub async fn initiate(&self, email: &str) -> Result<DateTime<Utc>, ResetError> {
        let token = generate_token();
        let expires_at = self.clock.now() + self.ttl;
        let link = self.reset_link(&token);

        self.store
            .put_reset_token(
                email,
                ResetToken {
                    token,
                    expires_at,
                },
            )
            .await?;

        tracing::info!(%email, %expires_at, "Password reset initiated");
        dispatch_password_reset(self.mailer.clone(), email.to_string(), link, self.mail_timeout);

        Ok(expires_at)
    }

    /// Redeem `token` and set `new_password`. Returns the account email.
    pub async fn consume(&self, token: &str, new_password: &str) -> Result<String, ResetError> {
        let (email, reset) = self
            .store
            .take_reset_token(token)
            .await
            .ok_or(ResetError::InvalidToken)?;

        if self.clock.now() >= reset.expires_at {
            tracing::warn!(%email, "Password reset with expired token");
            return Err(ResetError::Expired);
        }

        let hash = self
            .passwords
            .hash(new_password)
            .await
            .map_err(|e| ResetError::Internal(e.to_string()))?;
        self.store.set_password_hash(&email, hash).await?;

        tracing::info!(%email, "Password reset completed");
        Ok(email)
    }

    fn reset_link(&self, token: &str) -> Url {
        let mut link = self.link_base.clone();
        link.query_pairs_mut().append_pair("token", token);
        link
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::mailer::LogMailer;
    use crate::accounts::store::{InMemoryUserStore, UserRecord};
    use crate::auth::clock::ManualClock;
    use crate::auth::{Authorities, Authority};
    use chrono::TimeZone;

    struct Fixture {
        store: Arc<InMemoryUserStore>,
        clock: ManualClock,
        manager: ResetTokenManager,
        start: DateTime<Utc>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryUserStore::new());
        let passwords = PasswordHasher::new(4);
        let hash = passwords.hash("old-password").await.unwrap();
        store
            .insert(UserRecord::new(
                "u@x.com",
                hash,
                Authorities::new([Authority::USER]),
            ))
            .await
            .unwrap();

        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let manager = ResetTokenManager::new(
            store.clone(),
            passwords,
            Arc::new(LogMailer),
            Url::parse("http://localhost:3000/reset-password").unwrap(),
        )
        .with_clock(Arc::new(clock.clone()));

        Fixture {
            store,
            clock,
            manager,
            start,
        }
    }

    async fn pending_token(store: &InMemoryUserStore) -> String {
        store
            .find_by_email("u@x.com")
            .await
            .and_then(|u| u.reset)
            .map(|r| r.token)
            .unwrap()
    }

    #[test]
    fn tokens_are_random_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn reissue_invalidates_earlier_token() {
        let f = fixture().await;

        let expiry = f.manager.initiate("u@x.com").await.unwrap();
        assert_eq!(expiry, f.start + Duration::hours(1));
        let first = pending_token(&f.store).await;

        f.clock.advance(Duration::minutes(10));
        f.manager.initiate("u@x.com").await.unwrap();
        let second = pending_token(&f.store).await;
        assert_ne!(first, second);

        f.clock.set(f.start + Duration::minutes(59));
        assert!(matches!(
            f.manager.consume(&first, "new-password").await,
            Err(ResetError::InvalidToken)
        ));
        assert_eq!(f.manager.consume(&second, "new-password").await.unwrap(), "u@x.com");

        let user = f.store.find_by_email("u@x.com").await.unwrap();
        assert!(user.reset.is_none());
        assert!(PasswordHasher::new(4)
            .verify("new-password", &user.password_hash)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn token_is_consumed_exactly_once() {
        let f = fixture().await;
        f.manager.initiate("u@x.com").await.unwrap();
        let token = pending_token(&f.store).await;

        assert!(f.manager.consume(&token, "first-password").await.is_ok());
        assert!(matches!(
            f.manager.consume(&token, "second-password").await,
            Err(ResetError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn expired_token_is_rejected_and_cleared() {
        let f = fixture().await;
        f.manager.initiate("u@x.com").await.unwrap();
        let token = pending_token(&f.store).await;

        f.clock.set(f.start + Duration::hours(1));
        assert!(matches!(
            f.manager.consume(&token, "new-password").await,
            Err(ResetError::Expired)
        ));
        assert!(matches!(
            f.manager.consume(&token, "new-password").await,
            Err(ResetError::InvalidToken)
        ));

        let user = f.store.find_by_email("u@x.com").await.unwrap();
        assert!(user.reset.is_none());
        assert!(PasswordHasher::new(4)
            .verify("old-password", &user.password_hash)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let f = fixture().await;
        assert!(matches!(
            f.manager.initiate("nobody@x.com").await,
            Err(ResetError::NotFound)
        ));
    }

    #[tokio::test]
    async fn reset_link_carries_token() {
        let f = fixture().await;
        let link = f.manager.reset_link("abc-123");
        assert_eq!(link.as_str(), "http://localhost:3000/reset-password?token=abc-123");
    }
}
