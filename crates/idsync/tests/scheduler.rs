//! Scheduler cadence tests on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use idsync::{ReconciliationEngine, SyncError, SyncScheduler, SyncStatsTracker};
use idsync_core::{DocumentUser, Role, SyncOutcome, SyncTrigger};
use idsync_db::{MemoryDocumentStore, MemoryProfileStore};

const MINUTE: Duration = Duration::from_secs(60);

fn user(n: u32) -> DocumentUser {
    DocumentUser {
        id: format!("{:024x}", n),
        email: format!("user{n}@x.com"),
        full_name: format!("User {n}"),
        role: Role::User,
        is_active: true,
        created_at: None,
        updated_at: None,
        supabase_id: None,
    }
}

struct Fixture {
    documents: Arc<MemoryDocumentStore>,
    profiles: Arc<MemoryProfileStore>,
    scheduler: SyncScheduler,
}

fn fixture() -> Fixture {
    let documents = Arc::new(MemoryDocumentStore::with_users(vec![user(1)]));
    let profiles = Arc::new(MemoryProfileStore::new());
    let engine = ReconciliationEngine::new(
        documents.clone(),
        profiles.clone(),
        Arc::new(SyncStatsTracker::new()),
    );
    Fixture {
        documents,
        profiles,
        scheduler: SyncScheduler::new(Arc::new(engine), 10),
    }
}

/// Lets the timer task catch up without crossing the next tick.
async fn settle() {
    tokio::time::sleep(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_start_runs_immediately_then_on_cadence() {
    let f = fixture();

    assert!(f.scheduler.start(1).await.unwrap());
    settle().await;

    let status = f.scheduler.status().await;
    assert!(status.is_running);
    assert_eq!(status.sync_stats.total_syncs, 1);
    assert_eq!(status.next_sync_description, "1 minute(s)");
    assert!(status.next_sync_at.is_some());
    assert!(f.profiles.get_by_email("user1@x.com").await.is_some());

    tokio::time::sleep(MINUTE).await;
    assert_eq!(f.scheduler.status().await.sync_stats.total_syncs, 2);

    let history = f.scheduler.history().await;
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| r.trigger == SyncTrigger::Scheduled));
}

#[tokio::test(start_paused = true)]
async fn test_start_while_armed_keeps_existing_timer() {
    let f = fixture();

    assert!(f.scheduler.start(5).await.unwrap());
    assert!(!f.scheduler.start(1).await.unwrap());
    settle().await;

    let status = f.scheduler.status().await;
    assert_eq!(status.interval_minutes, 5);
    assert_eq!(status.sync_stats.total_syncs, 1);

    // Only the five-minute timer exists.
    tokio::time::sleep(2 * MINUTE).await;
    assert_eq!(f.scheduler.status().await.sync_stats.total_syncs, 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_halts_ticks() {
    let f = fixture();

    f.scheduler.start(1).await.unwrap();
    settle().await;
    assert!(f.scheduler.stop().await);
    assert!(!f.scheduler.stop().await);

    tokio::time::sleep(5 * MINUTE).await;

    let status = f.scheduler.status().await;
    assert!(!status.is_running);
    assert_eq!(status.next_sync_description, "Not scheduled");
    assert!(status.next_sync_at.is_none());
    assert_eq!(status.sync_stats.total_syncs, 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop() {
    let f = fixture();

    f.scheduler.start(1).await.unwrap();
    settle().await;
    f.scheduler.stop().await;

    assert!(f.scheduler.start(2).await.unwrap());
    settle().await;

    let status = f.scheduler.status().await;
    assert_eq!(status.interval_minutes, 2);
    assert_eq!(status.sync_stats.total_syncs, 2);
}

#[tokio::test(start_paused = true)]
async fn test_manual_trigger_leaves_timer_alone() {
    let f = fixture();

    f.scheduler.start(1).await.unwrap();
    settle().await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    let run = f.scheduler.trigger_sync().await;
    assert_eq!(run.trigger, SyncTrigger::Manual);
    assert!(run.is_success());
    assert_eq!(f.scheduler.status().await.sync_stats.total_syncs, 2);

    // Next tick still lands one minute after the first.
    tokio::time::sleep(Duration::from_secs(30)).await;
    settle().await;
    assert_eq!(f.scheduler.status().await.sync_stats.total_syncs, 3);
}

#[tokio::test]
async fn test_manual_trigger_when_idle() {
    let f = fixture();

    let run = f.scheduler.trigger_sync().await;

    assert_eq!(run.outcome, SyncOutcome::Completed);
    assert_eq!(run.counts.created_in_b, 1);
    assert!(!f.scheduler.is_armed().await);
    assert_eq!(f.scheduler.history().await[0].run_id, run.run_id);
}

#[tokio::test(start_paused = true)]
async fn test_failed_tick_keeps_timer_running() {
    let f = fixture();
    f.documents.set_unreachable(true).await;

    f.scheduler.start(1).await.unwrap();
    settle().await;

    let stats = f.scheduler.status().await.sync_stats;
    assert_eq!(stats.errors, 1);
    assert!(stats.last_error.unwrap().contains("document store"));
    assert!(f.scheduler.is_armed().await);

    f.documents.set_unreachable(false).await;
    tokio::time::sleep(MINUTE).await;

    let stats = f.scheduler.status().await.sync_stats;
    assert_eq!(stats.total_syncs, 2);
    assert_eq!(stats.successful_syncs, 1);
    assert_eq!(stats.errors, 1);
    assert!(stats.last_success_time.is_some());
}

#[tokio::test]
async fn test_reset_stats_keeps_history() {
    let f = fixture();

    f.scheduler.trigger_sync().await;
    f.scheduler.reset_stats();

    let stats = f.scheduler.status().await.sync_stats;
    assert_eq!(stats.total_syncs, 0);
    assert_eq!(stats.successful_syncs, 0);
    assert_eq!(f.scheduler.history().await.len(), 1);
}

#[tokio::test]
async fn test_invalid_interval_is_rejected() {
    let f = fixture();

    for minutes in [0, 1441] {
        let err = f.scheduler.start(minutes).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));
    }
    assert!(!f.scheduler.is_armed().await);
}
