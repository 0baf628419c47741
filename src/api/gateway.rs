// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway forwarding.
//!
//! Everything that passes the edge trust filter and is not a local health
//! route is forwarded verbatim to the upstream service, minus hop-by-hop
//! headers.

use axum::{
    body::{to_bytes, Body},
    extract::{FromRef, Request, State},
    http::{header, HeaderMap, HeaderName, Uri},
    response::Response,
};
use url::Url;

use crate::auth::{edge::is_canonical_path, EdgeState, KeyHandle};
use crate::error::ApiError;

/// Largest request body the gateway will buffer.
pub const MAX_FORWARD_BODY: usize = 2 * 1024 * 1024;

const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::CONTENT_LENGTH,
];

/// State of the gateway service.
#[derive(Clone, FromRef)]
pub struct GatewayState {
    pub keys: KeyHandle,
    pub edge: EdgeState,
    pub client: reqwest::Client,
    pub upstream: Url,
}

impl GatewayState {
    pub fn new(keys: KeyHandle, edge: EdgeState, upstream: Url) -> Self {
        Self {
            keys,
            edge,
            client: reqwest::Client::new(),
            upstream,
        }
    }
}

fn copy_end_to_end(from: &HeaderMap, to: &mut HeaderMap) {
    for (name, value) in from {
        if name == header::HOST || HOP_BY_HOP.contains(name) {
            continue;
        }
        to.append(name.clone(), value.clone());
    }
}

/// Upstream URL for `uri`: the upstream origin with the request's path and
/// query. The request can never change scheme, host or port.
fn upstream_target(upstream: &Url, uri: &Uri) -> Result<Url, ApiError> {
    let path = uri.path();
    if !is_canonical_path(path) {
        return Err(ApiError::bad_request("Invalid request path").with_code("invalid_path"));
    }

    let mut target = upstream.clone();
    target.set_path(path);
    target.set_query(uri.query());
    Ok(target)
}

/// Forward the request to the upstream service and relay its response.
pub async fn forward(
    State(gateway): State<GatewayState>,
    request: Request,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();

    let target = upstream_target(&gateway.upstream, &parts.uri)?;

    let body = to_bytes(body, MAX_FORWARD_BODY)
        .await
        .map_err(|_| ApiError::bad_request("Request body too large"))?;

    let mut headers = HeaderMap::new();
    copy_end_to_end(&parts.headers, &mut headers);

    let upstream = gateway
        .client
        .request(parts.method.clone(), target.clone())
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(%target, error = %e, "Upstream request failed");
            ApiError::bad_gateway("Upstream service unavailable")
        })?;

    let status = upstream.status();
    let mut response_headers = HeaderMap::new();
    copy_end_to_end(upstream.headers(), &mut response_headers);

    let bytes = upstream.bytes().await.map_err(|e| {
        tracing::error!(%target, error = %e, "Failed to read upstream response");
        ApiError::bad_gateway("Upstream service unavailable")
    })?;

    tracing::debug!(method = %parts.method, %target, %status, "Forwarded request");

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{catalog_router, gateway_router};
    use crate::auth::{
        Authorities, Authority, KeyMaterial, OpenEndpoints, TokenIssuer, TokenVerifier,
    };
    use crate::config::AppConfig;
    use crate::state::AppState;
    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct Deployment {
        gateway: axum::Router,
        issuer: TokenIssuer,
    }

    /// Gateway in front of a live catalog service sharing the same key.
    async fn deployment() -> Deployment {
        let keys = KeyHandle::new(KeyMaterial::generate());
        let config = AppConfig::from_lookup(|_| None).unwrap();

        let catalog = catalog_router(AppState::from_config(&config, keys.clone()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, catalog).await.unwrap();
        });

        let edge = EdgeState::new(TokenVerifier::new(keys.clone()), OpenEndpoints::default());
        let upstream = Url::parse(&format!("http://{addr}")).unwrap();
        let gateway = gateway_router(GatewayState::new(keys.clone(), edge, upstream));

        Deployment {
            gateway,
            issuer: TokenIssuer::new(keys, chrono::Duration::hours(1)),
        }
    }

    async fn send(
        app: &axum::Router,
        request: axum::http::Request<Body>,
    ) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn create_product(token: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder()
            .method("POST")
            .uri("/api/products/admin")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder
            .body(Body::from(
                json!({"name": "Lamp", "price_cents": 2500}).to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn admin_token_reaches_admin_endpoint_through_gateway() {
        let d = deployment().await;
        let token = d
            .issuer
            .issue("admin@x.com", &Authorities::new([Authority::USER, Authority::ADMIN]))
            .unwrap();

        let (status, body) = send(&d.gateway, create_product(Some(&token))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "Lamp");
        assert_eq!(body["created_by"], "admin@x.com");
    }

    #[tokio::test]
    async fn user_token_is_forbidden_downstream() {
        let d = deployment().await;
        let token = d
            .issuer
            .issue("u@x.com", &Authorities::new([Authority::USER]))
            .unwrap();

        let (status, body) = send(&d.gateway, create_product(Some(&token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "forbidden");
    }

    #[tokio::test]
    async fn missing_token_stops_at_edge() {
        let d = deployment().await;
        let (status, body) = send(&d.gateway, create_product(None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "missing_auth_header");
    }

    #[tokio::test]
    async fn forged_admin_headers_do_not_survive_the_edge() {
        let d = deployment().await;
        let token = d
            .issuer
            .issue("u@x.com", &Authorities::new([Authority::USER]))
            .unwrap();

        let mut request = create_product(Some(&token));
        request
            .headers_mut()
            .insert("x-user-roles", "ROLE_ADMIN".parse().unwrap());

        let (status, _) = send(&d.gateway, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn gateway_health_is_local_and_open() {
        let d = deployment().await;
        let request = axum::http::Request::builder()
            .uri("/health/live")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&d.gateway, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[test]
    fn target_keeps_upstream_origin() {
        let upstream = Url::parse("http://catalog.internal:8081").unwrap();

        let uri: Uri = "/api/products?page=2&q=lamp".parse().unwrap();
        let target = upstream_target(&upstream, &uri).unwrap();
        assert_eq!(target.as_str(), "http://catalog.internal:8081/api/products?page=2&q=lamp");

        for hostile in ["//evil.example:9000/steal", "/api/auth/login/../../users", "/a//b"] {
            let uri: Uri = hostile.parse().unwrap();
            let err = upstream_target(&upstream, &uri).unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST, "{hostile}");
        }
    }

    #[tokio::test]
    async fn scheme_relative_path_is_not_forwarded() {
        let d = deployment().await;
        let token = d
            .issuer
            .issue("u@x.com", &Authorities::new([Authority::USER]))
            .unwrap();

        let request = axum::http::Request::builder()
            .uri("//127.0.0.1:9/steal")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(&d.gateway, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "invalid_path");
    }

    #[test]
    fn hop_by_hop_headers_are_dropped() {
        let mut from = HeaderMap::new();
        from.insert(header::CONNECTION, "keep-alive".parse().unwrap());
        from.insert(header::HOST, "gateway.local".parse().unwrap());
        from.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        from.insert("x-user-email", "u@x.com".parse().unwrap());

        let mut to = HeaderMap::new();
        copy_end_to_end(&from, &mut to);
        assert!(to.get(header::CONNECTION).is_none());
        assert!(to.get(header::HOST).is_none());
        assert_eq!(to[header::CONTENT_TYPE], "application/json");
        assert_eq!(to["x-user-email"], "u@x.com");
    }
}
