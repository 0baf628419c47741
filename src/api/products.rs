// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Product catalog endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::AdminOnly;
use crate::catalog::CatalogStore;
use crate::error::ApiError;
use crate::models::{CreateProductRequest, Product};

/// List all products. Public.
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    responses(
        (status = 200, description = "All products", body = [Product]),
    )
)]
pub async fn list_products(State(catalog): State<CatalogStore>) -> Json<Vec<Product>> {
    Json(catalog.list().await)
}

/// Get one product. Public.
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = u64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 404, description = "Product not found"),
    )
)]
pub async fn get_product(
    State(catalog): State<CatalogStore>,
    Path(id): Path<u64>,
) -> Result<Json<Product>, ApiError> {
    catalog
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product not found"))
}

/// Add a product. Requires `ROLE_ADMIN`.
#[utoipa::path(
    post,
    path = "/api/products/admin",
    tag = "Products",
    security(("bearer" = [])),
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Invalid product"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin role required"),
    )
)]
pub async fn create_product(
    AdminOnly(admin): AdminOnly,
    State(catalog): State<CatalogStore>,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request("Product name is required"));
    }

    let product = catalog.create(request, &admin.subject).await;
    tracing::info!(id = product.id, by = %admin.subject, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}
