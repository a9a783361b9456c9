//! Resilient Cache Sidecar
//!
//! Runs the dual-tier cache layer as a standalone HTTP service for health
//! checks and manual cache administration. The library is the real product;
//! this binary is its composition root.

mod api;
mod cache;
mod config;
mod error;
mod models;
mod tasks;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{create_router, AppState};
use cache::{CacheManager, RedisRemote};
use config::Config;

/// Main entry point for the cache sidecar.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect to the remote cache service
/// 4. Build the cache manager (breaker, fallback store, sweep task)
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resilient_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resilient cache sidecar");

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        "Configuration loaded: prefix={}, default_ttl={}s, sweep_interval={}s, port={}",
        config.key_prefix, config.default_ttl, config.sweep_interval, config.server_port
    );

    // Connect to the remote cache service
    let remote = RedisRemote::connect(&config.redis_url, config.remote_timeout_ms).await?;

    // Build the cache manager at the composition root
    let manager = Arc::new(CacheManager::new(
        Arc::new(remote),
        config.breaker_config(),
        config.key_prefix.clone(),
        config.default_ttl,
        config.sweep_interval,
    ));
    info!("Cache manager initialized");

    // Create router with all endpoints
    let state = AppState::new(manager.clone());
    let app = create_router(state);

    // Bind to configured port
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Sidecar listening on http://{}", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(manager))
        .await?;

    info!("Sidecar shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, closes the cache manager (stopping its sweep task) and
/// allows graceful shutdown.
async fn shutdown_signal(manager: Arc<CacheManager>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    manager.close();
    warn!("Cache manager closed");
}
