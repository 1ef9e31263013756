//! # Reconciliation Engine
//!
//! One pass compares both stores by email and repairs the drift.
//!
//! ## Pass Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Reconciliation Pass                              │
//! │                                                                         │
//! │  1. GUARD     begin_run() ── in flight? ──► SyncRun { Skipped }        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. FETCH     try_join!(A.fetch_all, B.fetch_all)                      │
//! │       │       either fails ──► SyncRun { Failed, Connectivity }        │
//! │       ▼                                                                 │
//! │  3. INDEX     email → &DocumentUser     email → &ProfileRow            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. A → B     missing in B    ──► insert row          (created_in_b)   │
//! │       │       A leads + diff  ──► update_by_email     (updated_in_b)   │
//! │       │       B leads, blank name ─► fill B's name    (updated_in_b)   │
//! │       ▼                                                                 │
//! │  5. B → A     missing in A    ──► insert document     (created_in_a)   │
//! │       │       B leads + diff  ──► update_by_id        (updated_in_a)   │
//! │       │       A leads, blank name ─► fill A's name    (updated_in_a)   │
//! │       ▼                                                                 │
//! │  6. RECORD    stats + SyncRun { Completed | Failed }                   │
//! │                                                                         │
//! │  Steps 4 and 5 walk the sets fetched in step 2. The first failed       │
//! │  write ends the pass; writes before it stay committed.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! let engine = ReconciliationEngine::new(documents, profiles, stats);
//! let run = engine.run(SyncTrigger::Manual).await;
//! println!("{} writes", run.counts.writes());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::stats::SyncStatsTracker;
use idsync_core::diff::{new_document_from_profile, new_profile_from_document};
use idsync_core::validation::validate_email;
use idsync_core::{
    backfill_name, diff_fields, leader_of, DocumentUser, Leader, ProfileRow, SyncCounts,
    SyncOutcome, SyncRun, SyncTrigger,
};
use idsync_db::{DocumentStore, ProfileStore, StoreKind};

// =============================================================================
// Email Index
// =============================================================================

/// Records of one store keyed by normalized email, in fetch order.
struct EmailIndex<'a, T> {
    ordered: Vec<(String, &'a T)>,
    by_email: HashMap<String, &'a T>,
}

impl<'a, T> EmailIndex<'a, T> {
    /// Skips records without an email and later duplicates of an email.
    fn build(records: &'a [T], store: StoreKind, key: fn(&T) -> String) -> Self {
        let mut ordered = Vec::with_capacity(records.len());
        let mut by_email = HashMap::with_capacity(records.len());

        for record in records {
            let email = key(record);
            if email.is_empty() {
                warn!(%store, "Skipping user without email");
                continue;
            }
            if by_email.contains_key(&email) {
                warn!(%store, email = %email, "Skipping duplicate email");
                continue;
            }
            by_email.insert(email.clone(), record);
            ordered.push((email, record));
        }

        EmailIndex { ordered, by_email }
    }

    fn get(&self, email: &str) -> Option<&'a T> {
        self.by_email.get(email).copied()
    }

    fn len(&self) -> usize {
        self.ordered.len()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Reconciles Store A and Store B.
///
/// Holds no per-pass state. Concurrent calls are collapsed by the
/// single-flight guard in [`SyncStatsTracker`].
pub struct ReconciliationEngine {
    documents: Arc<dyn DocumentStore>,
    profiles: Arc<dyn ProfileStore>,
    stats: Arc<SyncStatsTracker>,
}

impl ReconciliationEngine {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        profiles: Arc<dyn ProfileStore>,
        stats: Arc<SyncStatsTracker>,
    ) -> Self {
        ReconciliationEngine {
            documents,
            profiles,
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<SyncStatsTracker> {
        &self.stats
    }

    /// Runs one full pass.
    ///
    /// Always returns a run record. A pass that hits an error is recorded
    /// in the stats and comes back as [`SyncOutcome::Failed`] with the
    /// counts of the writes that did land.
    pub async fn run(&self, trigger: SyncTrigger) -> SyncRun {
        let Some(_guard) = self.stats.begin_run() else {
            info!(%trigger, "Sync already in progress, skipping");
            return SyncRun::skipped(trigger);
        };

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!("sync_run", %run_id, %trigger);

        async {
            info!("Starting reconciliation pass");
            let mut counts = SyncCounts::default();
            let result = self.reconcile_all(&mut counts).await;
            self.finish(run_id, trigger, started_at, counts, result)
        }
        .instrument(span)
        .await
    }

    /// Reconciles a single user by email with the same rules as a full pass.
    ///
    /// ## Errors
    /// - [`SyncError::InvalidInput`] for a malformed email
    /// - [`SyncError::UserNotFound`] when neither store has the email;
    ///   stats are left untouched
    pub async fn sync_user(&self, email: &str) -> SyncResult<SyncRun> {
        let email = validate_email(email).map_err(SyncError::input)?;

        let Some(_guard) = self.stats.begin_run() else {
            info!(email = %email, "Sync already in progress, skipping");
            return Ok(SyncRun::skipped(SyncTrigger::SingleUser));
        };

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let trigger = SyncTrigger::SingleUser;
        let span = info_span!("sync_user", %run_id, email = %email);

        async {
            let fetched = tokio::try_join!(
                async {
                    self.documents
                        .find_by_email(&email)
                        .await
                        .map_err(|e| SyncError::read(StoreKind::Document, e))
                },
                async {
                    self.profiles
                        .find_by_email(&email)
                        .await
                        .map_err(|e| SyncError::read(StoreKind::Profile, e))
                },
            );

            let mut counts = SyncCounts::default();
            let result = match fetched {
                Ok((None, None)) => return Err(SyncError::UserNotFound(email.clone())),
                Ok((document, profile)) => {
                    self.reconcile_pair(&email, document.as_ref(), profile.as_ref(), &mut counts)
                        .await
                }
                Err(e) => Err(e),
            };

            Ok(self.finish(run_id, trigger, started_at, counts, result))
        }
        .instrument(span)
        .await
    }

    // =========================================================================
    // Pass Steps
    // =========================================================================

    async fn reconcile_all(&self, counts: &mut SyncCounts) -> SyncResult<()> {
        let (documents, profiles) = tokio::try_join!(
            async {
                self.documents
                    .fetch_all()
                    .await
                    .map_err(|e| SyncError::read(StoreKind::Document, e))
            },
            async {
                self.profiles
                    .fetch_all()
                    .await
                    .map_err(|e| SyncError::read(StoreKind::Profile, e))
            },
        )?;

        let document_index = EmailIndex::build(&documents, StoreKind::Document, DocumentUser::email_key);
        let profile_index = EmailIndex::build(&profiles, StoreKind::Profile, ProfileRow::email_key);

        debug!(
            documents = document_index.len(),
            profiles = profile_index.len(),
            "Fetched both stores"
        );

        for (email, user) in &document_index.ordered {
            counts.total_processed += 1;
            self.push_to_profiles(email, user, profile_index.get(email), counts)
                .await?;
        }

        for (email, row) in &profile_index.ordered {
            self.push_to_documents(email, row, document_index.get(email), counts)
                .await?;
        }

        Ok(())
    }

    /// Both directions for one email.
    async fn reconcile_pair(
        &self,
        email: &str,
        document: Option<&DocumentUser>,
        profile: Option<&ProfileRow>,
        counts: &mut SyncCounts,
    ) -> SyncResult<()> {
        if let Some(user) = document {
            counts.total_processed += 1;
            self.push_to_profiles(email, user, profile, counts).await?;
        }
        if let Some(row) = profile {
            self.push_to_documents(email, row, document, counts).await?;
        }
        Ok(())
    }

    /// A → B for one Store A user.
    async fn push_to_profiles(
        &self,
        email: &str,
        user: &DocumentUser,
        existing: Option<&ProfileRow>,
        counts: &mut SyncCounts,
    ) -> SyncResult<()> {
        let Some(row) = existing else {
            let new_row = new_profile_from_document(user, Utc::now());
            self.profiles
                .insert(new_row)
                .await
                .map_err(|e| SyncError::write(StoreKind::Profile, email, e))?;
            counts.created_in_b += 1;
            debug!(email = %email, "Created profile row");
            return Ok(());
        };

        let diff = match leader_of(user.updated_at, row.updated_at) {
            Leader::Document => diff_fields(&user.fields(), &row.fields()),
            Leader::Profile => backfill_name(&row.fields(), &user.fields()),
        };
        if diff.is_empty() {
            return Ok(());
        }

        debug!(email = %email, fields = ?diff.changed_fields(), "Updating profile row");
        let patch = diff.into_profile_patch(user.id.clone(), Utc::now());
        self.profiles
            .update_by_email(email, patch)
            .await
            .map_err(|e| SyncError::write(StoreKind::Profile, email, e))?;
        counts.updated_in_b += 1;

        Ok(())
    }

    /// B → A for one Store B row.
    async fn push_to_documents(
        &self,
        email: &str,
        row: &ProfileRow,
        existing: Option<&DocumentUser>,
        counts: &mut SyncCounts,
    ) -> SyncResult<()> {
        let Some(user) = existing else {
            let new_user = new_document_from_profile(row, Utc::now());
            self.documents
                .insert(new_user)
                .await
                .map_err(|e| SyncError::write(StoreKind::Document, email, e))?;
            counts.created_in_a += 1;
            debug!(email = %email, "Created user document");
            return Ok(());
        };

        let diff = match leader_of(user.updated_at, row.updated_at) {
            Leader::Profile => diff_fields(&row.fields(), &user.fields()),
            Leader::Document => backfill_name(&user.fields(), &row.fields()),
        };
        if diff.is_empty() {
            return Ok(());
        }

        debug!(email = %email, fields = ?diff.changed_fields(), "Updating user document");
        let patch = diff.into_document_patch(row.id, Utc::now());
        self.documents
            .update_by_id(&user.id, patch)
            .await
            .map_err(|e| SyncError::write(StoreKind::Document, email, e))?;
        counts.updated_in_a += 1;

        Ok(())
    }

    /// Records the outcome in the stats and builds the run record.
    fn finish(
        &self,
        run_id: Uuid,
        trigger: SyncTrigger,
        started_at: DateTime<Utc>,
        counts: SyncCounts,
        result: SyncResult<()>,
    ) -> SyncRun {
        let finished_at = Utc::now();
        let duration_ms = u64::try_from((finished_at - started_at).num_milliseconds()).unwrap_or(0);

        let (outcome, error) = match result {
            Ok(()) => {
                self.stats.record_success(finished_at);
                info!(
                    created_in_a = counts.created_in_a,
                    created_in_b = counts.created_in_b,
                    updated_in_a = counts.updated_in_a,
                    updated_in_b = counts.updated_in_b,
                    total_processed = counts.total_processed,
                    duration_ms,
                    "Reconciliation pass completed"
                );
                (SyncOutcome::Completed, None)
            }
            Err(e) => {
                let message = e.to_string();
                error!(
                    error = %e,
                    retryable = e.is_retryable(),
                    committed_writes = counts.writes(),
                    duration_ms,
                    "Reconciliation pass failed"
                );
                self.stats.record_failure(message.clone(), finished_at);
                (SyncOutcome::Failed, Some(message))
            }
        };

        SyncRun {
            run_id,
            trigger,
            outcome,
            started_at,
            finished_at,
            duration_ms,
            counts,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idsync_core::Role;
    use idsync_db::{MemoryDocumentStore, MemoryProfileStore};

    fn document(id: &str, email: &str) -> DocumentUser {
        DocumentUser {
            id: id.to_string(),
            email: email.to_string(),
            full_name: "Test".to_string(),
            role: Role::User,
            is_active: true,
            created_at: None,
            updated_at: None,
            supabase_id: None,
        }
    }

    #[test]
    fn test_index_skips_blank_and_duplicate_emails() {
        let users = vec![
            document("1", "a@x.com"),
            document("2", "   "),
            document("3", "A@X.com"),
            document("4", "b@x.com"),
        ];

        let index = EmailIndex::build(&users, StoreKind::Document, DocumentUser::email_key);
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("a@x.com").map(|u| u.id.as_str()), Some("1"));
        assert_eq!(index.ordered[1].0, "b@x.com");
    }

    #[tokio::test]
    async fn test_blank_email_is_not_processed() {
        let documents = Arc::new(MemoryDocumentStore::with_users(vec![document("1", "")]));
        let profiles = Arc::new(MemoryProfileStore::new());
        let engine = ReconciliationEngine::new(
            documents,
            profiles.clone(),
            Arc::new(SyncStatsTracker::new()),
        );

        let run = engine.run(SyncTrigger::Manual).await;
        assert!(run.is_success());
        assert_eq!(run.counts.total_processed, 0);
        assert!(profiles.rows().await.is_empty());
    }

    #[tokio::test]
    async fn test_sync_user_rejects_malformed_email() {
        let engine = ReconciliationEngine::new(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryProfileStore::new()),
            Arc::new(SyncStatsTracker::new()),
        );

        let err = engine.sync_user("not-an-email").await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_sync_user_not_found_leaves_stats_untouched() {
        let stats = Arc::new(SyncStatsTracker::new());
        let engine = ReconciliationEngine::new(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryProfileStore::new()),
            stats.clone(),
        );

        let err = engine.sync_user("ghost@x.com").await.unwrap_err();
        assert!(matches!(err, SyncError::UserNotFound(_)));
        assert_eq!(stats.snapshot().total_syncs, 0);
        assert!(!stats.is_running());
    }
}
