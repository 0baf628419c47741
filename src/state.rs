// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::extract::FromRef;

use crate::accounts::{
    AccountService, InMemoryUserStore, LogMailer, Mailer, PasswordHasher, ResetTokenManager,
    UserStore,
};
use crate::auth::clock::system_clock;
use crate::auth::{KeyHandle, SharedClock, TokenIssuer, TokenVerifier};
use crate::catalog::CatalogStore;
use crate::config::AppConfig;

/// Shared state of the accounts and catalog services.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub keys: KeyHandle,
    pub verifier: TokenVerifier,
    pub accounts: AccountService,
    pub resets: ResetTokenManager,
    pub catalog: CatalogStore,
}

impl AppState {
    /// In-memory state with the log mailer and the wall clock.
    pub fn from_config(config: &AppConfig, keys: KeyHandle) -> Self {
        Self::from_parts(
            config,
            keys,
            Arc::new(InMemoryUserStore::new()),
            Arc::new(LogMailer),
            system_clock(),
        )
    }

    pub fn from_parts(
        config: &AppConfig,
        keys: KeyHandle,
        store: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        clock: SharedClock,
    ) -> Self {
        let passwords = PasswordHasher::new(config.bcrypt_cost);
        let issuer = TokenIssuer::new(keys.clone(), config.token_ttl).with_clock(clock.clone());
        let verifier = TokenVerifier::new(keys.clone()).with_clock(clock.clone());

        let accounts = AccountService::new(store.clone(), passwords, issuer);
        let resets = ResetTokenManager::new(store, passwords, mailer, config.reset_link_base.clone())
            .with_ttl(config.reset_ttl)
            .with_clock(clock);

        Self {
            keys,
            verifier,
            accounts,
            resets,
            catalog: CatalogStore::new(),
        }
    }
}
