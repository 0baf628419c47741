// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults and the parsed [`AppConfig`].
//! Configuration is read once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SERVICE_MODE` | `gateway`, `accounts` or `catalog` | `accounts` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | Shared token signing secret (32+ bytes) | random, per process |
//! | `JWT_REQUIRE_SHARED_SECRET` | Refuse the random fallback key | `false` |
//! | `JWT_TTL_SECS` | Token lifetime | `86400` |
//! | `RESET_TOKEN_TTL_SECS` | Password reset token lifetime | `3600` |
//! | `RESET_LINK_BASE` | Base URL of emailed reset links | `http://localhost:3000/reset-password` |
//! | `OPEN_ENDPOINTS` | Comma-separated unauthenticated path prefixes | login, register, reset, health |
//! | `GATEWAY_UPSTREAM_URL` | Gateway forwarding target | `http://127.0.0.1:8081` |
//! | `GATEWAY_FORWARD_CREDENTIAL` | Keep `Authorization` on forwarded requests | `false` |
//! | `BCRYPT_COST` | Password hash cost | `12` |
//! | `SEED_ADMIN_EMAIL` | Bootstrap administrator email | unset |
//! | `SEED_ADMIN_PASSWORD` | Bootstrap administrator password | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{net::SocketAddr, str::FromStr};

use chrono::Duration;
use thiserror::Error;
use url::Url;

use crate::auth::edge::DEFAULT_OPEN_ENDPOINTS;
use crate::auth::OpenEndpoints;

pub const SERVICE_MODE_ENV: &str = "SERVICE_MODE";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Shared signing secret. Every issuer and verifier must see the same value.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

/// When `true`, a missing or short `JWT_SECRET` leaves the key unavailable
/// instead of generating a per-process key.
pub const JWT_REQUIRE_SHARED_SECRET_ENV: &str = "JWT_REQUIRE_SHARED_SECRET";

pub const JWT_TTL_SECS_ENV: &str = "JWT_TTL_SECS";
pub const RESET_TOKEN_TTL_SECS_ENV: &str = "RESET_TOKEN_TTL_SECS";
pub const RESET_LINK_BASE_ENV: &str = "RESET_LINK_BASE";
pub const OPEN_ENDPOINTS_ENV: &str = "OPEN_ENDPOINTS";
pub const GATEWAY_UPSTREAM_URL_ENV: &str = "GATEWAY_UPSTREAM_URL";
pub const GATEWAY_FORWARD_CREDENTIAL_ENV: &str = "GATEWAY_FORWARD_CREDENTIAL";
pub const BCRYPT_COST_ENV: &str = "BCRYPT_COST";
pub const SEED_ADMIN_EMAIL_ENV: &str = "SEED_ADMIN_EMAIL";
pub const SEED_ADMIN_PASSWORD_ENV: &str = "SEED_ADMIN_PASSWORD";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_JWT_TTL_SECS: i64 = 86_400;
pub const DEFAULT_RESET_TOKEN_TTL_SECS: i64 = 3_600;
pub const DEFAULT_RESET_LINK_BASE: &str = "http://localhost:3000/reset-password";
pub const DEFAULT_GATEWAY_UPSTREAM_URL: &str = "http://127.0.0.1:8081";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Which service this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceMode {
    /// Edge trust filter in front of a forwarding proxy.
    Gateway,
    /// User accounts, login and password reset.
    #[default]
    Accounts,
    /// Product catalog.
    Catalog,
}

impl FromStr for ServiceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gateway" => Ok(ServiceMode::Gateway),
            "accounts" => Ok(ServiceMode::Accounts),
            "catalog" => Ok(ServiceMode::Catalog),
            other => Err(format!("unknown service mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Bootstrap administrator credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Parsed process configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub mode: ServiceMode,
    pub bind: SocketAddr,
    pub jwt_secret: Option<String>,
    pub require_shared_secret: bool,
    pub token_ttl: Duration,
    pub reset_ttl: Duration,
    pub reset_link_base: Url,
    pub open_endpoints: OpenEndpoints,
    pub upstream: Url,
    pub forward_credential: bool,
    pub bcrypt_cost: u32,
    pub seed_admin: Option<SeedAdmin>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("mode", &self.mode)
            .field("bind", &self.bind)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("require_shared_secret", &self.require_shared_secret)
            .field("token_ttl", &self.token_ttl)
            .field("reset_ttl", &self.reset_ttl)
            .field("reset_link_base", &self.reset_link_base.as_str())
            .field("open_endpoints", &self.open_endpoints)
            .field("upstream", &self.upstream.as_str())
            .field("forward_credential", &self.forward_credential)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("seed_admin", &self.seed_admin)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    /// Read from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read through `lookup`; unset and blank values take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port: u16 = parse_or(&get, PORT_ENV, DEFAULT_PORT)?;
        let bind = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|e| invalid(HOST_ENV, &host, e))?;

        let open_endpoints = match get(OPEN_ENDPOINTS_ENV) {
            Some(list) => OpenEndpoints::new(list.split(',').map(str::trim)),
            None => OpenEndpoints::new(DEFAULT_OPEN_ENDPOINTS.iter().copied()),
        };

        let seed_admin = match (get(SEED_ADMIN_EMAIL_ENV), get(SEED_ADMIN_PASSWORD_ENV)) {
            (Some(email), Some(password)) => Some(SeedAdmin { email, password }),
            _ => None,
        };

        Ok(Self {
            mode: parse_or(&get, SERVICE_MODE_ENV, ServiceMode::default())?,
            bind,
            jwt_secret: get(JWT_SECRET_ENV),
            require_shared_secret: parse_flag(&get, JWT_REQUIRE_SHARED_SECRET_ENV)?,
            token_ttl: parse_secs(&get, JWT_TTL_SECS_ENV, DEFAULT_JWT_TTL_SECS)?,
            reset_ttl: parse_secs(&get, RESET_TOKEN_TTL_SECS_ENV, DEFAULT_RESET_TOKEN_TTL_SECS)?,
            reset_link_base: parse_url(&get, RESET_LINK_BASE_ENV, DEFAULT_RESET_LINK_BASE)?,
            open_endpoints,
            upstream: parse_url(&get, GATEWAY_UPSTREAM_URL_ENV, DEFAULT_GATEWAY_UPSTREAM_URL)?,
            forward_credential: parse_flag(&get, GATEWAY_FORWARD_CREDENTIAL_ENV)?,
            bcrypt_cost: parse_or(&get, BCRYPT_COST_ENV, bcrypt::DEFAULT_COST)?,
            seed_admin,
            log_format: parse_or(&get, LOG_FORMAT_ENV, LogFormat::default())?,
        })
    }
}

fn invalid(name: &'static str, value: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_or<G, T>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(name) {
        Some(raw) => raw.trim().parse().map_err(|e| invalid(name, &raw, e)),
        None => Ok(default),
    }
}

fn parse_flag<G>(get: &G, name: &'static str) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(invalid(name, &v, "expected a boolean")),
    }
}

fn parse_secs<G>(get: &G, name: &'static str, default: i64) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let secs: i64 = parse_or(get, name, default)?;
    if secs <= 0 {
        return Err(invalid(name, &secs.to_string(), "must be positive"));
    }
    Ok(Duration::seconds(secs))
}

fn parse_url<G>(get: &G, name: &'static str, default: &str) -> Result<Url, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let raw = get(name).unwrap_or_else(|| default.to_string());
    Url::parse(raw.trim()).map_err(|e| invalid(name, &raw, e))
}
