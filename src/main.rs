// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use relational_trust::{
    api::{accounts_router, catalog_router, gateway_router, GatewayState},
    auth::{EdgeState, KeyHandle, KeyMaterial, TokenVerifier},
    config::{AppConfig, ServiceMode},
    state::AppState,
    telemetry::init_tracing,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);
    tracing::debug!(?config, "Configuration loaded");

    let keys = KeyHandle::from_load(KeyMaterial::load(
        config.jwt_secret.as_deref(),
        !config.require_shared_secret,
    ));

    let app = match config.mode {
        ServiceMode::Gateway => {
            let edge = EdgeState::new(TokenVerifier::new(keys.clone()), config.open_endpoints.clone())
                .forward_credential(config.forward_credential);
            gateway_router(GatewayState::new(keys, edge, config.upstream.clone()))
        }
        ServiceMode::Accounts => {
            let state = AppState::from_config(&config, keys);
            if let Some(seed) = &config.seed_admin {
                match state.accounts.ensure_admin(&seed.email, &seed.password).await {
                    Ok(()) => tracing::info!(email = %seed.email, "Seed admin ready"),
                    Err(e) => tracing::warn!(email = %seed.email, error = %e, "Seed admin not created"),
                }
            }
            accounts_router(state)
        }
        ServiceMode::Catalog => catalog_router(AppState::from_config(&config, keys)),
    };

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!(
        mode = ?config.mode,
        addr = %listener.local_addr()?,
        "Relational Trust listening (docs at /docs)"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
