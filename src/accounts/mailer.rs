// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound email.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Upper bound on a single delivery attempt.
pub const DEFAULT_MAIL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

/// Delivery of account emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, link: &Url) -> Result<(), MailError>;
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, to: &str, link: &Url) -> Result<(), MailError> {
        tracing::info!(%to, "Password reset email");
        tracing::debug!(%to, %link, "Password reset link");
        Ok(())
    }
}

/// Send a reset email in the background.
///
/// The caller never waits on delivery; failures and timeouts are logged and
/// otherwise dropped.
pub fn dispatch_password_reset(mailer: Arc<dyn Mailer>, to: String, link: Url, timeout: Duration) {
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, mailer.send_password_reset(&to, &link)).await {
            Ok(Ok(())) => tracing::debug!(%to, "Password reset email dispatched"),
            Ok(Err(e)) => tracing::error!(%to, error = %e, "Failed to send password reset email"),
            Err(_) => tracing::error!(%to, ?timeout, "Password reset email timed out"),
        }
    });
}
