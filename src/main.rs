// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use wall_server::{api::router, config::Config, state::AppState};

#[tokio::main]
async fn main() {
    // .env must be loaded before the subscriber reads RUST_LOG/LOG_FORMAT.
    dotenv::dotenv().ok();
    wall_server::init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let bind = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config);
    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(&bind).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %bind, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(address = %bind, "Wall server listening (docs at /docs)");

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown.cancelled_owned())
    .await;

    if let Err(e) = served {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}
