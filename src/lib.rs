// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Trust - edge-authenticated identity propagation
//!
//! One binary runs in one of three modes:
//!
//! - **gateway** verifies bearer tokens at the perimeter, asserts identity to
//!   the upstream through `X-User-Email` / `X-User-Roles` and forwards.
//! - **accounts** owns users, login, roles and password reset.
//! - **catalog** serves products; writes require `ROLE_ADMIN`.
//!
//! Internal services accept either a locally verified token or the edge
//! assertion, and then apply a per-endpoint [`auth::AccessPolicy`].
//!
//! ## Modules
//!
//! - `api` - HTTP routers and handlers (Axum)
//! - `auth` - Token verification, trust filters and authorization
//! - `accounts` - User store, password hashing and reset tokens
//! - `catalog` - In-memory product catalog

pub mod accounts;
pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod telemetry;
