//! ValyanMed HTTP Server Binary
//!
//! Main entry point for the ValyanMed REST API server. It initializes the
//! repository, seeds the first admin account, sets up the HTTP router and
//! serves requests until Ctrl-C.
//!
//! # Usage
//!
//! ```bash
//! # Run with the local (in-memory) repository (default)
//! cargo run --bin valyanmed-server
//!
//! # Run against SQL Server
//! DB_SERVER=localhost DB_DATABASE=ValyanMed DB_USERNAME=sa DB_PASSWORD=... \
//!   cargo run --bin valyanmed-server --features "sqlserver-repo,http-server"
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `JWT_SECRET`, `JWT_ISSUER`, `JWT_TTL_MINUTES`: token settings
//! - `CORS_ORIGINS`: comma separated allowed origins (default: any)
//! - `ADMIN_PASSWORD`: password of the seeded `admin` account
//! - `REPOSITORY_TYPE`, `DB_*`: repository selection when no `repository.toml` exists
//! - `RUST_LOG`: Log filter (default: info)

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use valyanmed::config::ServerConfig;
use valyanmed::db;
use valyanmed::http::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting ValyanMed HTTP Server");

    let config = ServerConfig::from_env().map_err(anyhow::Error::msg)?;
    if config.jwt_secret_generated {
        warn!("JWT_SECRET is not set; using a random secret, tokens will not survive a restart");
    }

    // Initialize global repository once and reuse it across the app
    let repository = std::sync::Arc::clone(db::init_repository().await?);
    info!("Repository initialized successfully");

    let auth = config.auth_service();
    let generated = auth
        .ensure_admin_user(repository.as_ref(), config.admin_password.as_deref())
        .await
        .context("Failed to seed the admin account")?;
    if let Some(password) = generated {
        warn!(
            "Created user 'admin' with generated password '{}'; change it after the first login",
            password
        );
    }

    let state = AppState::new(repository, auth).with_cors_origins(config.cors_origins.clone());
    let app = create_router(state);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_address()))?;

    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
