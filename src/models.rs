// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the accounts and catalog services. All
//! types derive `Serialize`, `Deserialize` and `ToSchema` for JSON handling
//! and OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Auth**: registration, login, password reset
//! - **Users**: profiles and admin listings
//! - **Products**: catalog entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Authorities;

/// Minimum password length accepted on reset.
pub const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// Common
// =============================================================================

/// Outcome envelope for operations without a payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// =============================================================================
// Auth Models
// =============================================================================

/// Credentials for registration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Credentials for login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    /// Always `Bearer`.
    pub token_type: String,
    pub email: String,
    pub roles: Vec<String>,
    /// Token expiration.
    pub expires_at: DateTime<Utc>,
}

/// Start a password reset.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Complete a password reset.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

// =============================================================================
// User Models
// =============================================================================

/// Postal address attached to a profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Address {
    pub street: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    pub country: String,
}

/// Editable profile of a user. Replaced as a whole on update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
}

/// Account as shown to its owner or to an administrator.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub email: String,
    pub roles: Authorities,
    pub profile: UserProfile,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product Models
// =============================================================================

/// Catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Price in minor currency units.
    pub price_cents: u64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Request to add a product.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: u64,
}
