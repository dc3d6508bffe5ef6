//! Quotesync Server - remote authority for offline-first quote lists.
//!
//! This server stores the shared quote set in PostgreSQL, serves it over HTTP
//! (`GET /quotes`, `POST /quotes`) and pushes change notifications to
//! connected clients over a WebSocket (`GET /ws`).

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod routes;
mod websocket;

use crate::config::Config;
use crate::db::Pool;
use crate::websocket::ConnectionManager;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub config: Arc<Config>,
    pub conn_manager: Arc<ConnectionManager>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quotesync_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env()?);
    if config.auth_secret.is_none() {
        tracing::warn!("AUTH_SECRET not set, accepting anonymous requests");
    }

    let pool = db::create_pool(&config.database_url).await?;
    db::prepare_database(&pool, config.seed_demo_data, routes::now_millis()).await?;

    let addr = format!("{}:{}", config.host, config.port);
    let app = routes::create_app(AppState {
        pool,
        config,
        conn_manager: ConnectionManager::new_shared(),
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Quotesync Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
