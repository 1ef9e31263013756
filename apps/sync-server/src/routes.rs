//! HTTP handlers for the sync control surface.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Route                          Handler             Scheduler call     │
//! │  ─────────────────────────────  ──────────────────  ────────────────── │
//! │  GET  /api/sync/status          status_handler      status()           │
//! │  POST /api/sync/trigger         trigger_handler     trigger_sync()     │
//! │  POST /api/sync/start           start_handler       start(n)           │
//! │  POST /api/sync/stop            stop_handler        stop()             │
//! │  POST /api/sync/reset-stats     reset_handler       reset_stats()      │
//! │  GET  /api/sync/logs            logs_handler        status + history   │
//! │  POST /api/sync/users/{email}   sync_user_handler   sync_user(email)   │
//! │  GET  /health                   health_handler      -                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Successful responses are `{"success": true, "data": ..}` and/or
//! `{"success": true, "message": ..}`.

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use idsync::SchedulerStatus;
use idsync_core::{SyncOutcome, SyncRun, SyncStats, DEFAULT_INTERVAL_MINUTES};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

// =============================================================================
// Envelopes
// =============================================================================

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    fn data(data: T) -> Json<Self> {
        Json(ApiResponse {
            success: true,
            message: None,
            data: Some(data),
        })
    }

    fn with_message(message: impl Into<String>, data: T) -> Json<Self> {
        Json(ApiResponse {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        })
    }
}

fn message(message: impl Into<String>) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        message: Some(message.into()),
        data: None,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default = "default_interval")]
    pub interval_minutes: u64,
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_MINUTES
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLogs {
    pub sync_stats: SyncStats,
    pub scheduler_status: SchedulerStatus,
    pub recent_runs: Vec<SyncRun>,
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::data(state.scheduler.status().await)
}

/// Runs a pass and answers once it is done.
pub async fn trigger_handler(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    info!("Manual sync triggered via API");
    let run = state.scheduler.trigger_sync().await;
    run_response(run, "Sync triggered successfully")
}

/// An empty body starts at the default cadence.
pub async fn start_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let request: StartRequest = if body.iter().all(u8::is_ascii_whitespace) {
        StartRequest {
            interval_minutes: default_interval(),
        }
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid start request: {}", e)))?
    };

    let minutes = request.interval_minutes;
    let started = state.scheduler.start(minutes).await?;
    let text = if started {
        format!("Sync scheduler started with {} minute interval", minutes)
    } else {
        "Sync scheduler already running".to_string()
    };

    Ok(ApiResponse::with_message(text, state.scheduler.status().await))
}

pub async fn stop_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.scheduler.stop().await {
        message("Sync scheduler stopped")
    } else {
        message("Sync scheduler was not running")
    }
}

pub async fn reset_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.scheduler.reset_stats();
    message("Sync statistics reset")
}

pub async fn logs_handler(State(state): State<AppState>) -> impl IntoResponse {
    let scheduler_status = state.scheduler.status().await;
    ApiResponse::data(SyncLogs {
        sync_stats: scheduler_status.sync_stats.clone(),
        scheduler_status,
        recent_runs: state.scheduler.history().await,
    })
}

pub async fn sync_user_handler(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let run = state.scheduler.sync_user(&email).await?;
    run_response(run, format!("User {} synchronized", email.trim()))
}

pub async fn health_handler() -> impl IntoResponse {
    "OK"
}

/// Failed runs become a 500, skipped runs a 409.
fn run_response(run: SyncRun, done: impl Into<String>) -> ApiResult<Json<ApiResponse<SyncRun>>> {
    match run.outcome {
        SyncOutcome::Completed => Ok(ApiResponse::with_message(done, run)),
        SyncOutcome::Skipped => Err(ApiError::SyncInProgress),
        SyncOutcome::Failed => Err(ApiError::SyncFailed(
            run.error.unwrap_or_else(|| "Sync failed".to_string()),
        )),
    }
}
