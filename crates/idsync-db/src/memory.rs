//! # In-Memory Stores
//!
//! Process-local implementations of both store traits, used by the engine
//! and scheduler tests and for local dry runs.
//!
//! Both stores match emails on `normalize_email`, the key the Postgres
//! adapter computes in SQL, and enforce uniqueness on it like the real
//! ones. Both support fault injection:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Fault                      Effect                                     │
//! │  ─────────────────────────  ─────────────────────────────────────────  │
//! │  set_unreachable(true)      every call fails with Connection           │
//! │  fail_writes_for(email)     insert/update of that email fails (Write)  │
//! │  fail_after_writes(n)       writes after the n-th successful one fail  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreKind, StoreResult};
use crate::store::{DocumentStore, ProfileStore};
use idsync_core::{
    normalize_email, DocumentPatch, DocumentUser, NewDocumentUser, NewProfileRow, ProfilePatch,
    ProfileRow,
};

// =============================================================================
// Fault Injection
// =============================================================================

#[derive(Debug, Default)]
struct Faults {
    unreachable: bool,
    failing_emails: HashSet<String>,
    writes_allowed: Option<u64>,
    writes: u64,
}

impl Faults {
    fn check_reachable(&self, store: StoreKind) -> StoreResult<()> {
        if self.unreachable {
            return Err(StoreError::Connection {
                store,
                message: "injected outage".to_string(),
            });
        }
        Ok(())
    }

    /// Checks a write for `email` and counts it when allowed.
    fn admit_write(&mut self, store: StoreKind, email: &str) -> StoreResult<()> {
        self.check_reachable(store)?;

        if self.failing_emails.contains(&normalize_email(email)) {
            return Err(StoreError::Write {
                store,
                message: format!("injected write failure for {email}"),
            });
        }

        if let Some(allowed) = self.writes_allowed {
            if self.writes >= allowed {
                return Err(StoreError::Write {
                    store,
                    message: format!("injected write failure after {allowed} writes"),
                });
            }
        }

        self.writes += 1;
        Ok(())
    }
}

// =============================================================================
// Store A
// =============================================================================

#[derive(Debug, Default)]
struct DocumentState {
    users: Vec<DocumentUser>,
    next_id: u64,
    faults: Faults,
}

/// In-memory [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    state: RwLock<DocumentState>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `users` as-is (ids included).
    pub fn with_users(users: Vec<DocumentUser>) -> Self {
        let next_id = users.len() as u64;
        MemoryDocumentStore {
            state: RwLock::new(DocumentState {
                users,
                next_id,
                faults: Faults::default(),
            }),
        }
    }

    /// Snapshot of all documents in insertion order.
    pub async fn users(&self) -> Vec<DocumentUser> {
        self.state.read().await.users.clone()
    }

    pub async fn get_by_email(&self, email: &str) -> Option<DocumentUser> {
        let key = normalize_email(email);
        self.state
            .read()
            .await
            .users
            .iter()
            .find(|u| u.email_key() == key)
            .cloned()
    }

    /// Successful writes so far (inserts plus updates).
    pub async fn write_count(&self) -> u64 {
        self.state.read().await.faults.writes
    }

    pub async fn set_unreachable(&self, unreachable: bool) {
        self.state.write().await.faults.unreachable = unreachable;
    }

    pub async fn fail_writes_for(&self, email: &str) {
        self.state
            .write()
            .await
            .faults
            .failing_emails
            .insert(normalize_email(email));
    }

    pub async fn fail_after_writes(&self, allowed: u64) {
        self.state.write().await.faults.writes_allowed = Some(allowed);
    }

    /// Removes every injected fault.
    pub async fn heal(&self) {
        let mut state = self.state.write().await;
        let writes = state.faults.writes;
        state.faults = Faults {
            writes,
            ..Faults::default()
        };
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn fetch_all(&self) -> StoreResult<Vec<DocumentUser>> {
        let state = self.state.read().await;
        state.faults.check_reachable(StoreKind::Document)?;
        Ok(state.users.clone())
    }

    async fn insert(&self, user: NewDocumentUser) -> StoreResult<String> {
        let mut state = self.state.write().await;
        let key = normalize_email(&user.email);

        if state.users.iter().any(|u| u.email_key() == key) {
            return Err(StoreError::Duplicate {
                store: StoreKind::Document,
                key,
            });
        }
        state.faults.admit_write(StoreKind::Document, &key)?;

        state.next_id += 1;
        let id = format!("{:024x}", state.next_id);
        state.users.push(DocumentUser {
            id: id.clone(),
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
            created_at: Some(user.created_at),
            updated_at: Some(user.updated_at),
            supabase_id: Some(user.supabase_id),
        });

        Ok(id)
    }

    async fn update_by_id(&self, id: &str, patch: DocumentPatch) -> StoreResult<()> {
        let mut state = self.state.write().await;

        let index = state
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| StoreError::not_found(StoreKind::Document, id))?;
        let email = state.users[index].email.clone();
        state.faults.admit_write(StoreKind::Document, &email)?;

        let user = &mut state.users[index];
        if let Some(full_name) = patch.full_name {
            user.full_name = full_name;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(is_active) = patch.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Some(patch.updated_at);
        user.supabase_id = Some(patch.supabase_id);

        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<DocumentUser>> {
        self.state
            .read()
            .await
            .faults
            .check_reachable(StoreKind::Document)?;
        Ok(self.get_by_email(email).await)
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.state
            .read()
            .await
            .faults
            .check_reachable(StoreKind::Document)
    }
}

// =============================================================================
// Store B
// =============================================================================

#[derive(Debug, Default)]
struct ProfileState {
    rows: Vec<ProfileRow>,
    faults: Faults,
}

/// In-memory [`ProfileStore`].
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    state: RwLock<ProfileState>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `rows` as-is.
    pub fn with_rows(rows: Vec<ProfileRow>) -> Self {
        MemoryProfileStore {
            state: RwLock::new(ProfileState {
                rows,
                faults: Faults::default(),
            }),
        }
    }

    /// Snapshot of all rows in insertion order.
    pub async fn rows(&self) -> Vec<ProfileRow> {
        self.state.read().await.rows.clone()
    }

    pub async fn get_by_email(&self, email: &str) -> Option<ProfileRow> {
        let key = normalize_email(email);
        self.state
            .read()
            .await
            .rows
            .iter()
            .find(|r| r.email_key() == key)
            .cloned()
    }

    /// Successful writes so far (inserts plus updates).
    pub async fn write_count(&self) -> u64 {
        self.state.read().await.faults.writes
    }

    pub async fn set_unreachable(&self, unreachable: bool) {
        self.state.write().await.faults.unreachable = unreachable;
    }

    pub async fn fail_writes_for(&self, email: &str) {
        self.state
            .write()
            .await
            .faults
            .failing_emails
            .insert(normalize_email(email));
    }

    pub async fn fail_after_writes(&self, allowed: u64) {
        self.state.write().await.faults.writes_allowed = Some(allowed);
    }

    /// Removes every injected fault.
    pub async fn heal(&self) {
        let mut state = self.state.write().await;
        let writes = state.faults.writes;
        state.faults = Faults {
            writes,
            ..Faults::default()
        };
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn fetch_all(&self) -> StoreResult<Vec<ProfileRow>> {
        let state = self.state.read().await;
        state.faults.check_reachable(StoreKind::Profile)?;
        Ok(state.rows.clone())
    }

    async fn insert(&self, row: NewProfileRow) -> StoreResult<Uuid> {
        let mut state = self.state.write().await;
        let key = normalize_email(&row.email);

        if state.rows.iter().any(|r| r.email_key() == key) {
            return Err(StoreError::Duplicate {
                store: StoreKind::Profile,
                key,
            });
        }
        state.faults.admit_write(StoreKind::Profile, &key)?;

        let id = Uuid::new_v4();
        state.rows.push(ProfileRow {
            id,
            email: row.email,
            full_name: row.full_name,
            role: row.role,
            is_active: row.is_active,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
            mongo_id: Some(row.mongo_id),
        });

        Ok(id)
    }

    async fn update_by_email(&self, email: &str, patch: ProfilePatch) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let key = normalize_email(email);

        let index = state
            .rows
            .iter()
            .position(|r| r.email_key() == key)
            .ok_or_else(|| StoreError::not_found(StoreKind::Profile, key.as_str()))?;
        state.faults.admit_write(StoreKind::Profile, &key)?;

        let row = &mut state.rows[index];
        if let Some(full_name) = patch.full_name {
            row.full_name = full_name;
        }
        if let Some(role) = patch.role {
            row.role = role;
        }
        if let Some(is_active) = patch.is_active {
            row.is_active = is_active;
        }
        row.updated_at = Some(patch.updated_at);
        row.mongo_id = Some(patch.mongo_id);

        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<ProfileRow>> {
        self.state
            .read()
            .await
            .faults
            .check_reachable(StoreKind::Profile)?;
        Ok(self.get_by_email(email).await)
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.state
            .read()
            .await
            .faults
            .check_reachable(StoreKind::Profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use idsync_core::Role;

    fn new_profile(email: &str) -> NewProfileRow {
        let now = Utc::now();
        NewProfileRow {
            email: email.to_string(),
            full_name: "Test".to_string(),
            role: Role::User,
            is_active: true,
            created_at: now,
            updated_at: now,
            mongo_id: "000000000000000000000001".to_string(),
        }
    }

    fn new_document(email: &str) -> NewDocumentUser {
        let now = Utc::now();
        NewDocumentUser {
            email: email.to_string(),
            full_name: "Test".to_string(),
            role: Role::User,
            is_active: true,
            created_at: now,
            updated_at: now,
            supabase_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_profile_insert_and_update() {
        let store = MemoryProfileStore::new();
        store.insert(new_profile("a@x.com")).await.unwrap();

        let patch = ProfilePatch {
            full_name: None,
            role: Some(Role::Admin),
            is_active: None,
            updated_at: Utc::now(),
            mongo_id: "abc".to_string(),
        };
        store.update_by_email("A@X.com", patch).await.unwrap();

        let row = store.get_by_email("a@x.com").await.unwrap();
        assert_eq!(row.role, Role::Admin);
        assert_eq!(row.full_name, "Test");
        assert_eq!(row.mongo_id.as_deref(), Some("abc"));
        assert_eq!(store.write_count().await, 2);
    }

    #[tokio::test]
    async fn test_update_matches_padded_stored_email() {
        let mut row = new_profile("x@x.com");
        row.email = "\tPad@X.com ".to_string();
        let store = MemoryProfileStore::new();
        store.insert(row).await.unwrap();

        let patch = ProfilePatch {
            full_name: Some("Pat".to_string()),
            role: None,
            is_active: None,
            updated_at: Utc::now(),
            mongo_id: "abc".to_string(),
        };
        store.update_by_email("pad@x.com", patch).await.unwrap();

        let row = store.find_by_email("PAD@x.com").await.unwrap().unwrap();
        assert_eq!(row.full_name, "Pat");
    }

    #[tokio::test]
    async fn test_duplicate_email_ignores_case() {
        let store = MemoryProfileStore::new();
        store.insert(new_profile("a@x.com")).await.unwrap();
        let err = store.insert(new_profile("A@X.COM")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));

        let docs = MemoryDocumentStore::new();
        docs.insert(new_document("b@x.com")).await.unwrap();
        assert!(docs.insert(new_document("B@x.com")).await.is_err());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let docs = MemoryDocumentStore::new();
        let patch = DocumentPatch {
            full_name: Some("X".to_string()),
            role: None,
            is_active: None,
            updated_at: Utc::now(),
            supabase_id: Uuid::new_v4(),
        };
        let err = docs.update_by_id("nope", patch).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_document_ids_are_unique_hex() {
        let docs = MemoryDocumentStore::new();
        let a = docs.insert(new_document("a@x.com")).await.unwrap();
        let b = docs.insert(new_document("b@x.com")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 24);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = MemoryProfileStore::new();

        store.set_unreachable(true).await;
        assert!(store.fetch_all().await.unwrap_err().is_connection());
        assert!(store.health_check().await.is_err());
        store.set_unreachable(false).await;

        store.fail_writes_for("bad@x.com").await;
        assert!(store.insert(new_profile("bad@x.com")).await.is_err());
        assert!(store.insert(new_profile("good@x.com")).await.is_ok());

        store.fail_after_writes(1).await;
        assert!(store.insert(new_profile("late@x.com")).await.is_err());

        store.heal().await;
        assert!(store.insert(new_profile("late@x.com")).await.is_ok());
        assert_eq!(store.write_count().await, 2);
    }
}
