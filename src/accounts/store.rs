// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User persistence.
//!
//! [`UserStore`] is the seam to whatever holds user records. The in-process
//! default, [`InMemoryUserStore`], keeps everything behind one
//! `tokio::sync::RwLock`, so every trait method is applied atomically.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::auth::{Authorities, Authority};
use crate::models::UserProfile;

/// Pending password reset bound to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Stored account.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Unique key; also the token subject
    pub email: String,
    /// bcrypt hash
    pub password_hash: String,
    pub authorities: Authorities,
    pub profile: UserProfile,
    /// At most one active reset per user
    pub reset: Option<ResetToken>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(email: impl Into<String>, password_hash: String, authorities: Authorities) -> Self {
        Self {
            email: email.into(),
            password_hash,
            authorities,
            profile: UserProfile::default(),
            reset: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("user not found")]
    NotFound,
    #[error("email is already in use")]
    AlreadyExists,
}

/// Key-value user storage, keyed by email.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Option<UserRecord>;

    /// Insert a new record; fails if the email is taken.
    async fn insert(&self, user: UserRecord) -> Result<(), StoreError>;

    async fn list(&self) -> Vec<UserRecord>;

    async fn set_password_hash(&self, email: &str, password_hash: String)
        -> Result<(), StoreError>;

    /// Add an authority. Returns `false` if it was already held.
    async fn grant_authority(&self, email: &str, authority: Authority) -> Result<bool, StoreError>;

    async fn update_profile(&self, email: &str, profile: UserProfile)
        -> Result<UserProfile, StoreError>;

    /// Replace any pending reset of `email` with `reset`.
    async fn put_reset_token(&self, email: &str, reset: ResetToken) -> Result<(), StoreError>;

    /// Remove the reset identified by `token` and return its owner.
    ///
    /// Removal is unconditional: whatever the caller decides next, the token
    /// cannot be taken twice.
    async fn take_reset_token(&self, token: &str) -> Option<(String, ResetToken)>;
}

#[derive(Default)]
struct Tables {
    users: HashMap<String, UserRecord>,
    /// reset token → email
    resets: HashMap<String, String>,
}

/// In-process [`UserStore`]. Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Option<UserRecord> {
        self.tables.read().await.users.get(email).cloned()
    }

    async fn insert(&self, user: UserRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&user.email) {
            return Err(StoreError::AlreadyExists);
        }
        tables.users.insert(user.email.clone(), user);
        Ok(())
    }

    async fn list(&self) -> Vec<UserRecord> {
        let tables = self.tables.read().await;
        let mut users: Vec<UserRecord> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.email.cmp(&b.email)));
        users
    }

    async fn set_password_hash(
        &self,
        email: &str,
        password_hash: String,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(email).ok_or(StoreError::NotFound)?;
        user.password_hash = password_hash;
        Ok(())
    }

    async fn grant_authority(&self, email: &str, authority: Authority) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(email).ok_or(StoreError::NotFound)?;
        if user.authorities.contains(authority.as_str()) {
            return Ok(false);
        }
        user.authorities.push(authority);
        Ok(true)
    }

    async fn update_profile(
        &self,
        email: &str,
        profile: UserProfile,
    ) -> Result<UserProfile, StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(email).ok_or(StoreError::NotFound)?;
        user.profile = profile;
        Ok(user.profile.clone())
    }

    async fn put_reset_token(&self, email: &str, reset: ResetToken) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let Tables { users, resets } = &mut *tables;

        let user = users.get_mut(email).ok_or(StoreError::NotFound)?;
        if let Some(previous) = user.reset.take() {
            resets.remove(&previous.token);
        }
        resets.insert(reset.token.clone(), email.to_string());
        user.reset = Some(reset);
        Ok(())
    }

    async fn take_reset_token(&self, token: &str) -> Option<(String, ResetToken)> {
        let mut tables = self.tables.write().await;
        let Tables { users, resets } = &mut *tables;

        let email = resets.remove(token)?;
        let user = users.get_mut(&email)?;
        match user.reset.take() {
            Some(reset) if reset.token == token => Some((email, reset)),
            other => {
                user.reset = other;
                None
            }
        }
    }
}
