//! # Sync Statistics
//!
//! Cumulative counters for the process plus the single-flight guard.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SyncStatsTracker (shared via Arc)                                     │
//! │                                                                         │
//! │   running: AtomicBool ──► begin_run() ──► RunGuard ──drop──► false     │
//! │                                                                         │
//! │   stats: Mutex<SyncStats>                                              │
//! │     record_success()  total++, successful++, last_sync_time            │
//! │     record_failure()  total++, errors++, last_error, last_sync_time    │
//! │     reset()           counters and last_error to zero                  │
//! │     snapshot()        copy, with is_running read from the guard        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::debug;

use idsync_core::SyncStats;

/// Process-wide reconciliation statistics.
#[derive(Debug, Default)]
pub struct SyncStatsTracker {
    running: AtomicBool,
    stats: Mutex<SyncStats>,
}

impl SyncStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the single-flight slot.
    ///
    /// Returns `None` when a pass is already in flight. The slot is released
    /// when the guard drops, including on early return or panic.
    pub fn begin_run(&self) -> Option<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard { tracker: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Records a completed pass.
    pub fn record_success(&self, finished_at: DateTime<Utc>) {
        let mut stats = self.lock();
        stats.total_syncs += 1;
        stats.successful_syncs += 1;
        stats.last_sync_time = Some(finished_at);
        stats.last_success_time = Some(finished_at);
    }

    /// Records a failed pass.
    pub fn record_failure(&self, error: impl Into<String>, finished_at: DateTime<Utc>) {
        let mut stats = self.lock();
        stats.total_syncs += 1;
        stats.errors += 1;
        stats.last_error = Some(error.into());
        stats.last_sync_time = Some(finished_at);
    }

    /// Zeroes counters and the last error. Timestamps are kept.
    pub fn reset(&self) {
        let mut stats = self.lock();
        stats.total_syncs = 0;
        stats.successful_syncs = 0;
        stats.errors = 0;
        stats.last_error = None;
        debug!("Sync statistics reset");
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> SyncStats {
        let mut stats = self.lock().clone();
        stats.is_running = self.is_running();
        stats
    }

    fn lock(&self) -> MutexGuard<'_, SyncStats> {
        // Counters stay meaningful even if a holder panicked.
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the single-flight slot for the duration of one pass.
#[derive(Debug)]
pub struct RunGuard<'a> {
    tracker: &'a SyncStatsTracker,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.tracker.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_is_exclusive_and_released_on_drop() {
        let tracker = SyncStatsTracker::new();

        let guard = tracker.begin_run();
        assert!(guard.is_some());
        assert!(tracker.is_running());
        assert!(tracker.begin_run().is_none());
        assert!(tracker.snapshot().is_running);

        drop(guard);
        assert!(!tracker.is_running());
        assert!(tracker.begin_run().is_some());
    }

    #[test]
    fn test_guard_released_on_panic() {
        let tracker = SyncStatsTracker::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = tracker.begin_run();
            panic!("boom");
        }));

        assert!(result.is_err());
        assert!(!tracker.is_running());
    }

    #[test]
    fn test_record_and_reset() {
        let tracker = SyncStatsTracker::new();
        let t1 = Utc::now();

        tracker.record_success(t1);
        tracker.record_failure("profile store unreachable", t1);

        let stats = tracker.snapshot();
        assert_eq!(stats.total_syncs, 2);
        assert_eq!(stats.successful_syncs, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.last_error.as_deref(), Some("profile store unreachable"));
        assert_eq!(stats.last_sync_time, Some(t1));

        tracker.reset();
        let stats = tracker.snapshot();
        assert_eq!(stats.total_syncs, 0);
        assert_eq!(stats.successful_syncs, 0);
        assert_eq!(stats.errors, 0);
        assert!(stats.last_error.is_none());
        assert_eq!(stats.last_sync_time, Some(t1));
        assert_eq!(stats.last_success_time, Some(t1));
    }
}
