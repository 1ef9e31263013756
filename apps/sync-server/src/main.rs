//! # idsync Sync Server
//!
//! Connects both identity stores, arms the scheduler and serves the
//! control surface.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. tracing (RUST_LOG or default filter)                               │
//! │  2. SyncConfig::load (file → env)                                      │
//! │  3. connect Store A (MongoDB) and Store B (PostgreSQL)                 │
//! │  4. engine + scheduler, start(interval) when autostart                 │
//! │  5. axum::serve until Ctrl+C / SIGTERM, then stop the scheduler        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use idsync::{ReconciliationEngine, SyncConfig, SyncScheduler, SyncStatsTracker};
use idsync_db::{MongoUserStore, PgProfileStore};
use idsync_server::{router, AppState, DEFAULT_LOG_FILTER};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(true)
        .init();

    info!("Starting idsync sync server...");

    let config_path = std::env::var_os("IDSYNC_CONFIG").map(PathBuf::from);
    let config = SyncConfig::load(config_path).context("Failed to load configuration")?;
    info!(
        port = config.server.port,
        interval_minutes = config.scheduler.interval_minutes,
        autostart = config.scheduler.autostart,
        "Configuration loaded"
    );

    let documents = MongoUserStore::connect(&config.document_store)
        .await
        .context("Failed to connect to the document store")?;
    info!(database = %config.document_store.database, "Connected to MongoDB");

    let profiles = PgProfileStore::connect(&config.profile_store)
        .await
        .context("Failed to connect to the profile store")?;
    info!("Connected to PostgreSQL");

    let engine = Arc::new(ReconciliationEngine::new(
        Arc::new(documents),
        Arc::new(profiles),
        Arc::new(SyncStatsTracker::new()),
    ));
    let scheduler = Arc::new(SyncScheduler::new(engine, config.scheduler.history_size));

    if config.scheduler.autostart {
        scheduler.start(config.scheduler.interval_minutes).await?;
    } else {
        info!("Autostart disabled, scheduler idle until started via API");
    }

    let app = router(AppState::new(scheduler.clone()));

    let bind_addr = config.server.bind_address();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    info!(addr = %bind_addr, "Sync server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
