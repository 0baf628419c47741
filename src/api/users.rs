// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{extract::State, Json};

use crate::accounts::{AccountService, UserRecord};
use crate::auth::{AdminOnly, Auth, IdentityContext};
use crate::error::ApiError;
use crate::models::{UserProfile, UserSummary};

impl From<UserRecord> for UserSummary {
    fn from(user: UserRecord) -> Self {
        Self {
            email: user.email,
            roles: user.authorities,
            profile: user.profile,
            created_at: user.created_at,
        }
    }
}

/// Identity of the caller as established by the trust filters.
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller identity", body = IdentityContext),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn get_current_user(Auth(identity): Auth) -> Json<IdentityContext> {
    Json(identity)
}

/// The caller's stored account and profile.
#[utoipa::path(
    get,
    path = "/api/users/profile",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Account and profile", body = UserSummary),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No account for the caller"),
    )
)]
pub async fn get_profile(
    Auth(identity): Auth,
    State(accounts): State<AccountService>,
) -> Result<Json<UserSummary>, ApiError> {
    let user = accounts.find(&identity.subject).await?;
    Ok(Json(user.into()))
}

/// Replace the caller's profile.
#[utoipa::path(
    put,
    path = "/api/users/profile",
    tag = "Users",
    security(("bearer" = [])),
    request_body = UserProfile,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No account for the caller"),
    )
)]
pub async fn update_profile(
    Auth(identity): Auth,
    State(accounts): State<AccountService>,
    Json(profile): Json<UserProfile>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = accounts.update_profile(&identity.subject, profile).await?;
    Ok(Json(profile))
}

/// All accounts. Requires `ROLE_ADMIN`.
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All accounts", body = [UserSummary]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin role required"),
    )
)]
pub async fn list_users(
    AdminOnly(_admin): AdminOnly,
    State(accounts): State<AccountService>,
) -> Json<Vec<UserSummary>> {
    let users = accounts.list_users().await;
    Json(users.into_iter().map(UserSummary::from).collect())
}
