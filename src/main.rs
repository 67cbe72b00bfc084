// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Project Feed Service
//!
//! Receives project webhooks on `POST /webhook` and serves the published
//! feed on `GET /projects.geojson`.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and `.env` if present):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `WEBHOOK_SECRET`: Shared HMAC secret (default: unset)
//! - `SIGNATURE_HEADER`, `SIGNATURE_ALGORITHM`, `SIGNATURE_ENCODING`,
//!   `REQUIRE_SIGNATURE`: signature policy (default: x-signature, sha1, base64, false)
//! - `REQUIRED_LABEL`: Label gating publication (default: publish everything)
//! - `JITTER_RADIUS_METERS`, `JITTER_SALT`: Privacy jitter (default: disabled)
//! - `FEED_MAX_AGE_SECS`: Feed cache lifetime for CDNs (default: 30)
//! - `STORE_BACKEND`, `STORE_PATH`, `STORE_PAGE_SIZE`: Record store (default: surreal, memory, 1000)

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use project_feed::{config::Config, handlers, store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        signature_header = %config.signature.header,
        signature_algorithm = %config.signature.algorithm,
        secret_configured = !config.signature.secret.is_empty(),
        required_label = ?config.publish.required_label,
        jitter_radius_meters = config.publish.jitter_radius_meters,
        store_backend = ?config.store.backend,
        "Starting project feed service"
    );

    let store = store::open_store(&config.store).await?;
    let addr: SocketAddr = config.bind_addr.parse()?;
    let state = handlers::AppState::new(config, store)?;

    // Serve a feed that reflects whatever the store already holds
    state.regenerator.trigger();

    let app = handlers::router(state);
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
