// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory product catalog.

use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::{CreateProductRequest, Product};

#[derive(Default)]
struct Inventory {
    next_id: u64,
    products: BTreeMap<u64, Product>,
}

/// Product storage. Clones share the same inventory.
#[derive(Clone, Default)]
pub struct CatalogStore {
    inner: Arc<RwLock<Inventory>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All products in id order.
    pub async fn list(&self) -> Vec<Product> {
        self.inner.read().await.products.values().cloned().collect()
    }

    pub async fn get(&self, id: u64) -> Option<Product> {
        self.inner.read().await.products.get(&id).cloned()
    }

    pub async fn create(&self, request: CreateProductRequest, created_by: &str) -> Product {
        let mut inventory = self.inner.write().await;
        inventory.next_id += 1;

        let product = Product {
            id: inventory.next_id,
            name: request.name,
            description: request.description,
            price_cents: request.price_cents,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };
        inventory.products.insert(product.id, product.clone());
        product
    }
}
