// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP routers for the three service modes.
//!
//! Internal services (accounts, catalog) share one layer stack, outermost
//! first:
//!
//! 1. CORS, request id, tracing
//! 2. credential filter (local token verification)
//! 3. internal trust filter (edge-asserted headers)
//! 4. authorization filter (per-endpoint policy)
//!
//! The gateway runs only the edge trust filter and forwards.

use std::sync::Arc;

use axum::{
    http::Method,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{
    credential::credential_filter, edge::edge_trust_filter, internal::internal_trust_filter,
    policy::authorization_filter, AccessPolicy, Authorities, Authority, IdentityContext,
    IdentitySource, Requirement, TokenVerifier,
};
use crate::models::{
    Address, CreateProductRequest, ForgotPasswordRequest, LoginRequest, LoginResponse,
    MessageResponse, Product, RegisterRequest, ResetPasswordRequest, UserProfile, UserSummary,
};
use crate::state::AppState;

pub mod auth;
pub mod gateway;
pub mod health;
pub mod products;
pub mod users;

pub use gateway::GatewayState;

fn health_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    crate::auth::KeyHandle: axum::extract::FromRef<S>,
{
    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
}

/// Endpoints reachable without identity on every internal service.
fn base_policy(default: Requirement) -> AccessPolicy {
    AccessPolicy::new(default)
        .rule("/health/**", Requirement::Public)
        .rule("/docs/**", Requirement::Public)
        .rule("/api-doc/**", Requirement::Public)
}

/// Access rules of the accounts service.
pub fn accounts_policy() -> AccessPolicy {
    base_policy(Requirement::Authenticated)
        .rule("/api/auth/login", Requirement::Public)
        .rule("/api/auth/register", Requirement::Public)
        .rule("/api/auth/forgot-password", Requirement::Public)
        .rule("/api/auth/reset-password", Requirement::Public)
        .rule("/api/auth/register-admin", Requirement::authority(Authority::ADMIN))
        .rule("/api/auth/promote/{email}", Requirement::authority(Authority::ADMIN))
        .rule("/api/users/profile", Requirement::authority(Authority::USER))
        .rule_for(Method::GET, "/api/users", Requirement::authority(Authority::ADMIN))
}

/// Access rules of the catalog service.
pub fn catalog_policy() -> AccessPolicy {
    base_policy(Requirement::Authenticated)
        .rule("/api/products/admin/**", Requirement::authority(Authority::ADMIN))
        .rule_for(Method::GET, "/api/products", Requirement::Public)
        .rule_for(Method::GET, "/api/products/{id}", Requirement::Public)
}

/// Wrap an internal service router in the trust and authorization stack.
fn internal_service(router: Router, verifier: TokenVerifier, policy: AccessPolicy) -> Router {
    router
        .layer(middleware::from_fn_with_state(
            Arc::new(policy),
            authorization_filter,
        ))
        .layer(middleware::from_fn(internal_trust_filter))
        .layer(middleware::from_fn_with_state(verifier, credential_filter))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

pub fn accounts_router(state: AppState) -> Router {
    let verifier = state.verifier.clone();

    let routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/register-admin", post(auth::register_admin))
        .route("/api/auth/promote/{email}", put(auth::promote))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/users", get(users::list_users))
        .route("/api/users/me", get(users::get_current_user))
        .route(
            "/api/users/profile",
            get(users::get_profile).put(users::update_profile),
        )
        .merge(health_routes())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", AccountsApiDoc::openapi()));

    internal_service(routes, verifier, accounts_policy())
}

pub fn catalog_router(state: AppState) -> Router {
    let verifier = state.verifier.clone();

    let routes = Router::new()
        .route("/api/products", get(products::list_products))
        .route("/api/products/{id}", get(products::get_product))
        .route("/api/products/admin", post(products::create_product))
        .merge(health_routes())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", CatalogApiDoc::openapi()));

    internal_service(routes, verifier, catalog_policy())
}

pub fn gateway_router(state: GatewayState) -> Router {
    let edge = state.edge.clone();

    Router::new()
        .merge(health_routes())
        .fallback(gateway::forward)
        .with_state(state)
        .layer(middleware::from_fn_with_state(edge, edge_trust_filter))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::register_admin,
        auth::promote,
        auth::login,
        auth::forgot_password,
        auth::reset_password,
        users::get_current_user,
        users::get_profile,
        users::update_profile,
        users::list_users,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            MessageResponse,
            UserProfile,
            Address,
            UserSummary,
            IdentityContext,
            IdentitySource,
            Authorities,
            Authority
        )
    ),
    tags(
        (name = "Auth", description = "Login, registration and password reset"),
        (name = "Users", description = "Accounts and profiles"),
        (name = "Health", description = "Liveness and readiness")
    )
)]
struct AccountsApiDoc;

#[derive(OpenApi)]
#[openapi(
    paths(
        products::list_products,
        products::get_product,
        products::create_product,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(schemas(Product, CreateProductRequest)),
    tags(
        (name = "Products", description = "Product catalog"),
        (name = "Health", description = "Liveness and readiness")
    )
)]
struct CatalogApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{KeyHandle, KeyMaterial, TokenIssuer};
    use crate::config::AppConfig;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_config() -> AppConfig {
        AppConfig::from_lookup(|name| (name == "BCRYPT_COST").then(|| "4".to_string())).unwrap()
    }

    fn accounts() -> (Router, AppState, TokenIssuer) {
        let keys = KeyHandle::new(KeyMaterial::generate());
        let state = AppState::from_config(&test_config(), keys.clone());
        let issuer = TokenIssuer::new(keys, chrono::Duration::hours(1));
        (accounts_router(state.clone()), state, issuer)
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_as(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn routers_build_with_all_routes() {
        let (app, _, _) = accounts();
        let _ = app.into_make_service();

        let keys = KeyHandle::new(KeyMaterial::generate());
        let _ = catalog_router(AppState::from_config(&test_config(), keys)).into_make_service();
    }

    #[tokio::test]
    async fn register_login_and_read_identity() {
        let (app, _, _) = accounts();

        let (status, _) = call(
            &app,
            post_json("/api/auth/register", json!({"email": "u@x.com", "password": "pw-123456"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            post_json("/api/auth/login", json!({"email": "u@x.com", "password": "pw-123456"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["roles"], json!(["ROLE_USER"]));
        let token = body["token"].as_str().unwrap().to_string();

        let (status, me) = call(&app, get_as("/api/users/me", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["subject"], "u@x.com");
        assert_eq!(me["source"], "credential");
    }

    #[tokio::test]
    async fn login_failure_is_generic_401() {
        let (app, _, _) = accounts();
        let (status, body) = call(
            &app,
            post_json("/api/auth/login", json!({"email": "ghost@x.com", "password": "whatever"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid email or password");
    }

    #[tokio::test]
    async fn duplicate_registration_is_400() {
        let (app, _, _) = accounts();
        let body = json!({"email": "u@x.com", "password": "pw-123456"});
        call(&app, post_json("/api/auth/register", body.clone())).await;
        let (status, body) = call(&app, post_json("/api/auth/register", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email is already in use");
    }

    #[tokio::test]
    async fn forgot_password_answers_identically() {
        let (app, state, _) = accounts();
        state.accounts.register("u@x.com", "pw-123456").await.unwrap();

        let known = call(
            &app,
            post_json("/api/auth/forgot-password", json!({"email": "u@x.com"})),
        )
        .await;
        let unknown = call(
            &app,
            post_json("/api/auth/forgot-password", json!({"email": "ghost@x.com"})),
        )
        .await;

        assert_eq!(known, unknown);
        assert_eq!(known.0, StatusCode::OK);
        assert_eq!(known.1["message"], auth::FORGOT_PASSWORD_MESSAGE);
        assert!(state.accounts.find("u@x.com").await.unwrap().reset.is_some());
    }

    #[tokio::test]
    async fn reset_password_flow_over_http() {
        let (app, state, _) = accounts();
        state.accounts.register("u@x.com", "old-password").await.unwrap();
        state.resets.initiate("u@x.com").await.unwrap();
        let token = state
            .accounts
            .find("u@x.com")
            .await
            .unwrap()
            .reset
            .unwrap()
            .token;

        let (status, body) = call(
            &app,
            post_json(
                "/api/auth/reset-password",
                json!({"token": token, "new_password": "short"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("at least 8"));

        let (status, _) = call(
            &app,
            post_json(
                "/api/auth/reset-password",
                json!({"token": token, "new_password": "new-password"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            post_json(
                "/api/auth/reset-password",
                json!({"token": token, "new_password": "new-password"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "invalid_token");

        assert!(state.accounts.login("u@x.com", "new-password").await.is_ok());
    }

    #[tokio::test]
    async fn admin_endpoints_require_admin() {
        let (app, state, issuer) = accounts();
        state.accounts.register("u@x.com", "pw-123456").await.unwrap();

        let user = issuer
            .issue("u@x.com", &Authorities::new([Authority::USER]))
            .unwrap();
        let admin = issuer
            .issue("root@x.com", &Authorities::new([Authority::ADMIN]))
            .unwrap();

        let (status, _) = call(&app, get_as("/api/users", &user)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&app, get_as("/api/users", &admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let mut promote = get_as("/api/auth/promote/u@x.com", &admin);
        *promote.method_mut() = Method::PUT;
        let (status, body) = call(&app, promote).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User promoted to admin successfully");

        let (status, _) = call(
            &app,
            post_json(
                "/api/auth/register-admin",
                json!({"email": "second@x.com", "password": "pw-123456"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn user_token_reaches_profile_but_not_admin_list() {
        let (app, _, issuer) = accounts();
        let credentials = json!({"email": "u@x.com", "password": "pw-123456"});
        call(&app, post_json("/api/auth/register", credentials.clone())).await;
        let (_, login) = call(&app, post_json("/api/auth/login", credentials)).await;
        let token = login["token"].as_str().unwrap().to_string();

        let (status, profile) = call(&app, get_as("/api/users/profile", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["email"], "u@x.com");

        let (status, body) = call(&app, get_as("/api/users", &token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "forbidden");

        let admin_only = issuer
            .issue("u@x.com", &Authorities::new([Authority::ADMIN]))
            .unwrap();
        let (status, _) = call(&app, get_as("/api/users/profile", &admin_only)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn asserted_headers_are_trusted_without_credential() {
        let (app, _, _) = accounts();
        let request = Request::builder()
            .uri("/api/users/me")
            .header("X-User-Email", "u@x.com")
            .header("X-User-Roles", "ROLE_USER")
            .body(Body::empty())
            .unwrap();

        let (status, me) = call(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["source"], "edge_assertion");
    }

    #[tokio::test]
    async fn bad_credential_does_not_fall_back_to_headers() {
        let (app, _, _) = accounts();
        let foreign = TokenIssuer::new(
            KeyHandle::new(KeyMaterial::generate()),
            chrono::Duration::hours(1),
        )
        .issue("root@x.com", &Authorities::new([Authority::ADMIN]))
        .unwrap();

        let request = Request::builder()
            .uri("/api/users")
            .header("Authorization", format!("Bearer {foreign}"))
            .header("X-User-Email", "root@x.com")
            .header("X-User-Roles", "ROLE_ADMIN")
            .body(Body::empty())
            .unwrap();

        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "invalid_credential");
    }

    #[tokio::test]
    async fn protected_route_without_identity_is_401() {
        let (app, _, _) = accounts();
        let request = Request::builder()
            .uri("/api/users/profile")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "unauthorized");
    }

    #[test]
    fn catalog_policy_matches_service_rules() {
        let policy = catalog_policy();
        assert_eq!(
            policy.requirement_for(&Method::GET, "/api/products/3"),
            &Requirement::Public
        );
        assert_eq!(
            policy.requirement_for(&Method::POST, "/api/products/admin"),
            &Requirement::authority(Authority::ADMIN)
        );
        assert_eq!(
            policy.requirement_for(&Method::DELETE, "/api/products/3"),
            &Requirement::Authenticated
        );
    }
}
