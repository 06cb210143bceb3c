//! # CylTrack API
//!
//! REST server for the gas-cylinder fleet tracker.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        API Server                                       │
//! │                                                                         │
//! │  Client ───► HTTP/JSON (8080) ───► Route modules ───► SQLite           │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │          Bearer token (JWT) + role policy table                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod auth;
mod config;
mod error;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::auth::JwtManager;
use crate::config::ApiConfig;
use cyltrack_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting CylTrack API server...");

    // Load configuration
    let config = ApiConfig::load()?;
    info!(
        port = config.http_port,
        db_path = %config.database_path,
        "Configuration loaded"
    );

    // Connect to database (runs migrations)
    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!("Connected to SQLite");

    // Create shared state
    let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_access_lifetime_secs);
    let state = Arc::new(AppState { db, jwt, config });

    // Build router and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.http_port));
    let app = routes::build(state);

    info!(%addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub jwt: JwtManager,
    pub config: ApiConfig,
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
