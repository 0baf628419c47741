// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration, login and account administration.

use std::sync::Arc;

use thiserror::Error;

use super::password::PasswordHasher;
use super::store::{StoreError, UserRecord, UserStore};
use crate::auth::{Authorities, Authority, IssuedToken, TokenError, TokenIssuer};
use crate::models::UserProfile;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("Email is already in use")]
    EmailInUse,
    /// Unknown email or wrong password; never says which.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User not found")]
    NotFound,
    #[error("token issuance failed: {0}")]
    Token(#[from] TokenError),
    #[error("account operation failed: {0}")]
    Internal(String),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AccountError::NotFound,
            StoreError::AlreadyExists => AccountError::EmailInUse,
        }
    }
}

/// Successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub email: String,
    pub authorities: Authorities,
    pub token: IssuedToken,
}

/// Result of a promotion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    Promoted,
    AlreadyAdmin,
}

/// Account operations over a [`UserStore`].
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
    passwords: PasswordHasher,
    issuer: TokenIssuer,
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>, passwords: PasswordHasher, issuer: TokenIssuer) -> Self {
        Self {
            store,
            passwords,
            issuer,
        }
    }

    /// Register with `ROLE_USER`.
    pub async fn register(&self, email: &str, password: &str) -> Result<String, AccountError> {
        self.create(email, password, Authority::user()).await
    }

    /// Register with `ROLE_ADMIN`.
    pub async fn register_admin(&self, email: &str, password: &str) -> Result<String, AccountError> {
        self.create(email, password, Authority::admin()).await
    }

    async fn create(
        &self,
        email: &str,
        password: &str,
        authority: Authority,
    ) -> Result<String, AccountError> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(AccountError::InvalidInput("Password is required"));
        }
        if self.store.find_by_email(&email).await.is_some() {
            tracing::warn!(%email, "Registration rejected: email in use");
            return Err(AccountError::EmailInUse);
        }

        let hash = self
            .passwords
            .hash(password)
            .await
            .map_err(|e| AccountError::Internal(e.to_string()))?;

        let authorities = Authorities::new([authority.as_str()]);
        self.store
            .insert(UserRecord::new(email.clone(), hash, authorities))
            .await?;

        tracing::info!(%email, %authority, "Account registered");
        Ok(email)
    }

    /// Check credentials and issue a token.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AccountError> {
        let email = normalize_email(email).map_err(|_| AccountError::InvalidCredentials)?;

        let Some(user) = self.store.find_by_email(&email).await else {
            // Spend the same bcrypt work as a real check.
            let _ = self.passwords.hash(password).await;
            tracing::info!(%email, "Login failed");
            return Err(AccountError::InvalidCredentials);
        };

        let matches = self
            .passwords
            .verify(password, &user.password_hash)
            .await
            .unwrap_or(false);
        if !matches {
            tracing::info!(%email, "Login failed");
            return Err(AccountError::InvalidCredentials);
        }

        let token = self.issuer.issue_token(&user.email, &user.authorities)?;
        tracing::info!(%email, "Login successful");

        Ok(Session {
            email: user.email,
            authorities: user.authorities,
            token,
        })
    }

    /// Grant `ROLE_ADMIN`, keeping existing authorities.
    pub async fn promote(&self, email: &str) -> Result<Promotion, AccountError> {
        let email = normalize_email(email)?;
        let granted = self.store.grant_authority(&email, Authority::admin()).await?;

        if granted {
            tracing::info!(%email, "User promoted to admin");
            Ok(Promotion::Promoted)
        } else {
            Ok(Promotion::AlreadyAdmin)
        }
    }

    pub async fn find(&self, email: &str) -> Result<UserRecord, AccountError> {
        self.store
            .find_by_email(email)
            .await
            .ok_or(AccountError::NotFound)
    }

    pub async fn list_users(&self) -> Vec<UserRecord> {
        self.store.list().await
    }

    pub async fn update_profile(
        &self,
        email: &str,
        profile: UserProfile,
    ) -> Result<UserProfile, AccountError> {
        Ok(self.store.update_profile(email, profile).await?)
    }

    /// Make sure `email` exists and holds `ROLE_ADMIN`.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<(), AccountError> {
        match self.register_admin(email, password).await {
            Ok(_) => Ok(()),
            Err(AccountError::EmailInUse) => self.promote(email).await.map(|_| ()),
            Err(e) => Err(e),
        }
    }
}

/// Trim and lowercase an email, rejecting anything without a plausible shape.
pub fn normalize_email(email: &str) -> Result<String, AccountError> {
    let email = email.trim().to_ascii_lowercase();
    if email.is_empty() {
        return Err(AccountError::InvalidInput("Email is required"));
    }

    let mut parts = email.split('@');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        _ => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(AccountError::InvalidInput("Invalid email format"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::store::InMemoryUserStore;
    use crate::auth::{KeyHandle, KeyMaterial, TokenVerifier};

    fn service() -> (AccountService, TokenVerifier) {
        let keys = KeyHandle::new(KeyMaterial::generate());
        let issuer = TokenIssuer::new(keys.clone(), chrono::Duration::hours(1));
        let service = AccountService::new(
            Arc::new(InMemoryUserStore::new()),
            PasswordHasher::new(4),
            issuer,
        );
        (service, TokenVerifier::new(keys))
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  U@X.com ").unwrap(), "u@x.com");
        for bad in ["", "plain", "@x.com", "u@x", "u@@x.com", "u@.com"] {
            assert!(normalize_email(bad).is_err(), "{bad}");
        }
    }

    #[tokio::test]
    async fn register_then_login_issues_verifiable_token() {
        let (service, verifier) = service();
        service.register("u@x.com", "secret-pw").await.unwrap();

        let session = service.login("U@x.com", "secret-pw").await.unwrap();
        assert_eq!(session.email, "u@x.com");
        assert_eq!(session.authorities.to_strings(), vec!["ROLE_USER"]);

        let claims = verifier.verify(&session.token.token).unwrap();
        assert_eq!(claims.sub, "u@x.com");
        assert_eq!(claims.auth, session.authorities);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let (service, _) = service();
        service.register("u@x.com", "pw-one").await.unwrap();
        assert!(matches!(
            service.register("u@x.com", "pw-two").await,
            Err(AccountError::EmailInUse)
        ));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (service, _) = service();
        service.register("u@x.com", "secret-pw").await.unwrap();

        let wrong_password = service.login("u@x.com", "nope").await.unwrap_err();
        let unknown_user = service.login("ghost@x.com", "nope").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert!(matches!(unknown_user, AccountError::InvalidCredentials));
    }

    #[tokio::test]
    async fn promote_keeps_existing_authorities_and_is_idempotent() {
        let (service, _) = service();
        service.register("u@x.com", "secret-pw").await.unwrap();

        assert_eq!(service.promote("u@x.com").await.unwrap(), Promotion::Promoted);
        assert_eq!(service.promote("u@x.com").await.unwrap(), Promotion::AlreadyAdmin);

        let user = service.find("u@x.com").await.unwrap();
        assert_eq!(user.authorities.to_strings(), vec!["ROLE_USER", "ROLE_ADMIN"]);
        assert!(matches!(service.promote("ghost@x.com").await, Err(AccountError::NotFound)));
    }

    #[tokio::test]
    async fn ensure_admin_creates_or_promotes() {
        let (service, _) = service();
        service.ensure_admin("root@x.com", "root-pw").await.unwrap();
        assert!(service.find("root@x.com").await.unwrap().authorities.contains(Authority::ADMIN));

        service.register("u@x.com", "secret-pw").await.unwrap();
        service.ensure_admin("u@x.com", "ignored").await.unwrap();
        assert!(service.find("u@x.com").await.unwrap().authorities.contains(Authority::ADMIN));
    }

    #[tokio::test]
    async fn login_with_unavailable_key_fails() {
        let service = AccountService::new(
            Arc::new(InMemoryUserStore::new()),
            PasswordHasher::new(4),
            TokenIssuer::new(KeyHandle::unavailable(), chrono::Duration::hours(1)),
        );
        service.register("u@x.com", "secret-pw").await.unwrap();
        assert!(matches!(
            service.login("u@x.com", "secret-pw").await,
            Err(AccountError::Token(TokenError::KeyUnavailable))
        ));
    }
}
