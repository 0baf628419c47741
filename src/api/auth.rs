// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication endpoints.
//!
//! Login and registration are open; admin registration and promotion require
//! `ROLE_ADMIN`. The password reset pair is open by necessity, and
//! `forgot-password` answers identically whether or not the account exists.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::accounts::{AccountService, Promotion, ResetError, ResetTokenManager};
use crate::auth::AdminOnly;
use crate::error::ApiError;
use crate::models::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
    ResetPasswordRequest, MIN_PASSWORD_LEN,
};

/// Body of every `forgot-password` response.
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If your email exists in our system, you will receive password reset instructions";

/// Register a new user with `ROLE_USER`.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = MessageResponse),
        (status = 400, description = "Invalid input or email in use"),
    )
)]
pub async fn register(
    State(accounts): State<AccountService>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    accounts.register(&request.email, &request.password).await?;
    Ok(Json(MessageResponse::ok("User registered successfully")))
}

/// Register a new administrator. Requires `ROLE_ADMIN`.
#[utoipa::path(
    post,
    path = "/api/auth/register-admin",
    tag = "Auth",
    security(("bearer" = [])),
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Admin registered", body = MessageResponse),
        (status = 400, description = "Invalid input or email in use"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin role required"),
    )
)]
pub async fn register_admin(
    AdminOnly(admin): AdminOnly,
    State(accounts): State<AccountService>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let email = accounts.register_admin(&request.email, &request.password).await?;
    tracing::info!(%email, by = %admin.subject, "Admin account created");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::ok("Admin registered successfully")),
    ))
}

/// Grant `ROLE_ADMIN` to an existing user. Requires `ROLE_ADMIN`.
#[utoipa::path(
    put,
    path = "/api/auth/promote/{email}",
    tag = "Auth",
    security(("bearer" = [])),
    params(("email" = String, Path, description = "Email of the user to promote")),
    responses(
        (status = 200, description = "User promoted or already admin", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn promote(
    AdminOnly(admin): AdminOnly,
    State(accounts): State<AccountService>,
    Path(email): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let message = match accounts.promote(&email).await? {
        Promotion::Promoted => {
            tracing::info!(%email, by = %admin.subject, "Promotion granted");
            "User promoted to admin successfully"
        }
        Promotion::AlreadyAdmin => "User is already an admin",
    };
    Ok(Json(MessageResponse::ok(message)))
}

/// Exchange email and password for a bearer token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 503, description = "Signing key unavailable"),
    )
)]
pub async fn login(
    State(accounts): State<AccountService>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session = accounts.login(&request.email, &request.password).await?;

    Ok(Json(LoginResponse {
        token: session.token.token,
        token_type: "Bearer".to_string(),
        email: session.email,
        roles: session.authorities.to_strings(),
        expires_at: session.token.expires_at,
    }))
}

/// Start a password reset.
///
/// Always answers 200 with the same body, so the response does not reveal
/// whether the email is registered.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Request accepted", body = MessageResponse),
    )
)]
pub async fn forgot_password(
    State(resets): State<ResetTokenManager>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Json<MessageResponse> {
    let email = request.email.trim().to_ascii_lowercase();

    match resets.initiate(&email).await {
        Ok(_) => {}
        Err(ResetError::NotFound) => {
            tracing::info!(%email, "Password reset requested for unknown email");
        }
        Err(e) => tracing::error!(%email, error = %e, "Password reset initiation failed"),
    }

    Json(MessageResponse::ok(FORGOT_PASSWORD_MESSAGE))
}

/// Complete a password reset with the emailed token.
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "invalid_token, expired_token or weak password"),
    )
)]
pub async fn reset_password(
    State(resets): State<ResetTokenManager>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if request.token.trim().is_empty() {
        return Err(ApiError::bad_request("Token is required"));
    }
    if request.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }

    resets
        .consume(request.token.trim(), &request.new_password)
        .await?;
    Ok(Json(MessageResponse::ok("Password has been reset successfully")))
}
