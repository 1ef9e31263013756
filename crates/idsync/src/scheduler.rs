//! # Sync Scheduler
//!
//! Drives the engine on a fixed cadence and out of band.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │            start(n)                          stop()                     │
//! │   ┌──────┐ ─────────────────────► ┌───────┐ ─────────────────► ┌──────┐│
//! │   │ IDLE │                        │ ARMED │                    │ IDLE ││
//! │   └──────┘ ◄───── stop() no-op    └───────┘ start(n) no-op     └──────┘│
//! │                                       │                                 │
//! │                                       │ tick 0 (immediate), n, 2n, ...  │
//! │                                       ▼                                 │
//! │                               engine.run(Scheduled)                     │
//! │                                                                         │
//! │   trigger_sync() runs the engine in either state and leaves the timer  │
//! │   alone. A failed tick is logged; the next tick runs on schedule.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The timer task follows the same shape as other background loops here:
//! `interval` + `MissedTickBehavior::Delay` + a shutdown channel in a
//! `select!`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::engine::ReconciliationEngine;
use crate::error::{SyncError, SyncResult};
use idsync_core::validation::validate_interval_minutes;
use idsync_core::{SyncOutcome, SyncRun, SyncStats, SyncTrigger, DEFAULT_INTERVAL_MINUTES};

// =============================================================================
// Status
// =============================================================================

/// Point-in-time view of the scheduler, as served by the control surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    /// True while the timer is armed (not whether a pass is in flight).
    pub is_running: bool,

    /// Current cadence, or the last one used when idle.
    pub interval_minutes: u64,

    /// `"{n} minute(s)"` when armed, `"Not scheduled"` otherwise.
    #[serde(rename = "nextSyncIn")]
    pub next_sync_description: String,

    pub next_sync_at: Option<DateTime<Utc>>,

    pub sync_stats: SyncStats,
}

// =============================================================================
// Run History
// =============================================================================

/// Bounded, newest-last record of finished runs.
#[derive(Debug)]
pub struct RunHistory {
    runs: RwLock<VecDeque<SyncRun>>,
    capacity: usize,
}

impl RunHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        RunHistory {
            runs: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends a run, evicting the oldest when full. Skipped runs are ignored.
    pub async fn record(&self, run: &SyncRun) {
        if run.is_skipped() {
            return;
        }
        let mut runs = self.runs.write().await;
        if runs.len() == self.capacity {
            runs.pop_front();
        }
        runs.push_back(run.clone());
    }

    /// Newest first.
    pub async fn recent(&self) -> Vec<SyncRun> {
        self.runs.read().await.iter().rev().cloned().collect()
    }
}

// =============================================================================
// Scheduler
// =============================================================================

struct Timer {
    shutdown_tx: mpsc::Sender<()>,
    _task: JoinHandle<()>,
}

struct SchedulerState {
    timer: Option<Timer>,
    interval_minutes: u64,
}

/// Owns the timer task and the run history.
pub struct SyncScheduler {
    engine: Arc<ReconciliationEngine>,
    history: Arc<RunHistory>,
    next_sync_at: Arc<RwLock<Option<DateTime<Utc>>>>,
    state: Mutex<SchedulerState>,
}

impl SyncScheduler {
    pub fn new(engine: Arc<ReconciliationEngine>, history_size: usize) -> Self {
        SyncScheduler {
            engine,
            history: Arc::new(RunHistory::new(history_size)),
            next_sync_at: Arc::new(RwLock::new(None)),
            state: Mutex::new(SchedulerState {
                timer: None,
                interval_minutes: DEFAULT_INTERVAL_MINUTES,
            }),
        }
    }

    pub fn engine(&self) -> &Arc<ReconciliationEngine> {
        &self.engine
    }

    /// Arms the timer: one pass now, then one every `interval_minutes`.
    ///
    /// Returns `Ok(false)` when already armed (nothing changes).
    ///
    /// ## Errors
    /// [`SyncError::InvalidConfig`] for a cadence outside 1..=1440 minutes.
    pub async fn start(&self, interval_minutes: u64) -> SyncResult<bool> {
        validate_interval_minutes(interval_minutes).map_err(SyncError::config)?;

        let mut state = self.state.lock().await;
        if state.timer.is_some() {
            info!(
                interval_minutes = state.interval_minutes,
                "Scheduler already running, ignoring start"
            );
            return Ok(false);
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let period = Duration::from_secs(interval_minutes * 60);
        let task = tokio::spawn(timer_loop(
            self.engine.clone(),
            self.history.clone(),
            self.next_sync_at.clone(),
            period,
            shutdown_rx,
        ));

        state.timer = Some(Timer {
            shutdown_tx,
            _task: task,
        });
        state.interval_minutes = interval_minutes;

        info!(interval_minutes, "Scheduler started");
        Ok(true)
    }

    /// Disarms the timer. An in-flight pass finishes on its own.
    ///
    /// Returns `false` when already idle.
    pub async fn stop(&self) -> bool {
        let mut state = self.state.lock().await;
        let Some(timer) = state.timer.take() else {
            info!("Scheduler not running, ignoring stop");
            return false;
        };

        // The loop also exits when the sender drops, so a full or closed
        // channel is fine here.
        let _ = timer.shutdown_tx.try_send(());
        *self.next_sync_at.write().await = None;

        info!("Scheduler stopped");
        true
    }

    pub async fn is_armed(&self) -> bool {
        self.state.lock().await.timer.is_some()
    }

    /// Runs a pass now, outside the timer.
    pub async fn trigger_sync(&self) -> SyncRun {
        info!("Manual sync triggered");
        let run = self.engine.run(SyncTrigger::Manual).await;
        self.history.record(&run).await;
        run
    }

    /// Reconciles one user now, outside the timer.
    pub async fn sync_user(&self, email: &str) -> SyncResult<SyncRun> {
        let run = self.engine.sync_user(email).await?;
        self.history.record(&run).await;
        Ok(run)
    }

    pub async fn status(&self) -> SchedulerStatus {
        let (armed, interval_minutes) = {
            let state = self.state.lock().await;
            (state.timer.is_some(), state.interval_minutes)
        };

        let next_sync_description = if armed {
            format!("{} minute(s)", interval_minutes)
        } else {
            "Not scheduled".to_string()
        };

        SchedulerStatus {
            is_running: armed,
            interval_minutes,
            next_sync_description,
            next_sync_at: if armed { *self.next_sync_at.read().await } else { None },
            sync_stats: self.engine.stats().snapshot(),
        }
    }

    /// Recent finished runs, newest first.
    pub async fn history(&self) -> Vec<SyncRun> {
        self.history.recent().await
    }

    pub fn reset_stats(&self) {
        self.engine.stats().reset();
    }
}

// =============================================================================
// Timer Task
// =============================================================================

async fn timer_loop(
    engine: Arc<ReconciliationEngine>,
    history: Arc<RunHistory>,
    next_sync_at: Arc<RwLock<Option<DateTime<Utc>>>>,
    period: Duration,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    info!(period_secs = period.as_secs(), "Scheduler timer starting");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let step = chrono::Duration::from_std(period).unwrap_or_else(|_| chrono::Duration::minutes(1));

    loop {
        tokio::select! {
            biased;

            // Shutdown (or scheduler dropped)
            _ = shutdown_rx.recv() => {
                info!("Scheduler timer shutting down");
                break;
            }

            _ = interval.tick() => {
                *next_sync_at.write().await = Some(Utc::now() + step);
                run_scheduled(&engine, &history).await;
            }
        }
    }

    info!("Scheduler timer stopped");
}

/// One scheduled pass in its own task, so a panic cannot take the timer
/// down with it.
async fn run_scheduled(engine: &Arc<ReconciliationEngine>, history: &RunHistory) {
    let engine = engine.clone();
    match tokio::spawn(async move { engine.run(SyncTrigger::Scheduled).await }).await {
        Ok(run) => {
            if run.outcome == SyncOutcome::Failed {
                warn!(
                    run_id = %run.run_id,
                    error = run.error.as_deref().unwrap_or_default(),
                    "Scheduled sync failed, waiting for next tick"
                );
            }
            history.record(&run).await;
        }
        Err(e) => error!(error = %e, "Scheduled sync task panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::SyncStatsTracker;
    use idsync_db::{MemoryDocumentStore, MemoryProfileStore};

    fn scheduler() -> SyncScheduler {
        let engine = ReconciliationEngine::new(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryProfileStore::new()),
            Arc::new(SyncStatsTracker::new()),
        );
        SyncScheduler::new(Arc::new(engine), 3)
    }

    #[tokio::test]
    async fn test_history_is_bounded_newest_first() {
        let history = RunHistory::new(2);
        let mut runs = Vec::new();
        for _ in 0..3 {
            let mut run = SyncRun::skipped(SyncTrigger::Manual);
            run.outcome = SyncOutcome::Completed;
            history.record(&run).await;
            runs.push(run);
        }

        let recent = history.recent().await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].run_id, runs[2].run_id);
        assert_eq!(recent[1].run_id, runs[1].run_id);

        history.record(&SyncRun::skipped(SyncTrigger::Manual)).await;
        assert_eq!(history.recent().await.len(), 2);
    }

    #[tokio::test]
    async fn test_start_rejects_zero_interval() {
        let scheduler = scheduler();
        let err = scheduler.start(0).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));
        assert!(!scheduler.is_armed().await);
    }

    #[tokio::test]
    async fn test_idle_status() {
        let scheduler = scheduler();
        let status = scheduler.status().await;
        assert!(!status.is_running);
        assert_eq!(status.interval_minutes, 1);
        assert_eq!(status.next_sync_description, "Not scheduled");
        assert!(status.next_sync_at.is_none());

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["nextSyncIn"], "Not scheduled");
        assert_eq!(json["syncStats"]["totalSyncs"], 0);
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let scheduler = scheduler();
        assert!(!scheduler.stop().await);
    }
}
