// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User accounts: storage, passwords, login and password reset.

pub mod mailer;
pub mod password;
pub mod reset;
pub mod service;
pub mod store;

pub use mailer::{LogMailer, Mailer};
pub use password::PasswordHasher;
pub use reset::{ResetError, ResetTokenManager};
pub use service::{AccountError, AccountService, Promotion, Session};
pub use store::{InMemoryUserStore, ResetToken, StoreError, UserRecord, UserStore};
