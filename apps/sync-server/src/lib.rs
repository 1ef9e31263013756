//! # idsync Sync Server
//!
//! HTTP control surface over the reconciliation scheduler.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Sync Server                                    │
//! │                                                                         │
//! │  operator ───► axum Router ───► AppState.scheduler ───► engine         │
//! │                (/api/sync/*)         │                    │             │
//! │                                      ▼                    ▼             │
//! │                                 timer task         Store A / Store B    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `IDSYNC_CONFIG` - Path to the TOML config file
//! - `MONGODB_URI` - Store A connection string
//! - `DATABASE_URL` - Store B connection string
//! - `PORT` / `IDSYNC_PORT` - Listen port (default: 3001)
//! - `RUST_LOG` - Log filter

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use idsync::SyncScheduler;

pub use error::{ApiError, ApiResult};

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,idsync=debug,sqlx=warn,mongodb=warn";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<SyncScheduler>,
}

impl AppState {
    pub fn new(scheduler: Arc<SyncScheduler>) -> Self {
        AppState { scheduler }
    }
}

/// Builds the control surface router.
pub fn router(state: AppState) -> Router {
    let sync = Router::new()
        .route("/status", get(routes::status_handler))
        .route("/trigger", post(routes::trigger_handler))
        .route("/start", post(routes::start_handler))
        .route("/stop", post(routes::stop_handler))
        .route("/reset-stats", post(routes::reset_handler))
        .route("/logs", get(routes::logs_handler))
        .route("/users/{email}", post(routes::sync_user_handler));

    Router::new()
        .nest("/api/sync", sync)
        .route("/health", get(routes::health_handler))
        .with_state(state)
}
