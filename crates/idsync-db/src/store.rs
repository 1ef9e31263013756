//! # Store Traits
//!
//! The engine only sees these two traits. Each store has a production
//! adapter and an in-memory twin.
//!
//! ```text
//! ┌──────────────────────────┐          ┌──────────────────────────┐
//! │ trait DocumentStore      │          │ trait ProfileStore       │
//! │  fetch_all               │          │  fetch_all               │
//! │  insert → _id            │          │  insert → id             │
//! │  update_by_id            │          │  update_by_email         │
//! │  find_by_email           │          │  find_by_email           │
//! │  health_check            │          │  health_check            │
//! ├──────────────────────────┤          ├──────────────────────────┤
//! │ MongoUserStore           │          │ PgProfileStore           │
//! │ MemoryDocumentStore      │          │ MemoryProfileStore       │
//! └──────────────────────────┘          └──────────────────────────┘
//! ```

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreResult;
use idsync_core::{
    DocumentPatch, DocumentUser, NewDocumentUser, NewProfileRow, ProfilePatch, ProfileRow,
};

/// Store A: the legacy document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Full scan of every user document.
    async fn fetch_all(&self) -> StoreResult<Vec<DocumentUser>>;

    /// Inserts a document and returns its native id.
    async fn insert(&self, user: NewDocumentUser) -> StoreResult<String>;

    /// Applies a partial update to the document with the given id.
    async fn update_by_id(&self, id: &str, patch: DocumentPatch) -> StoreResult<()>;

    /// Looks up one user by normalized email.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<DocumentUser>>;

    /// Cheap round trip to confirm the store is reachable.
    async fn health_check(&self) -> StoreResult<()>;
}

/// Store B: the relational profile store.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Full scan of `user_profiles`.
    async fn fetch_all(&self) -> StoreResult<Vec<ProfileRow>>;

    /// Inserts a row and returns the store-assigned id.
    async fn insert(&self, row: NewProfileRow) -> StoreResult<Uuid>;

    /// Applies a partial update to the row with the given email.
    async fn update_by_email(&self, email: &str, patch: ProfilePatch) -> StoreResult<()>;

    /// Looks up one row by normalized email.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<ProfileRow>>;

    /// Cheap round trip to confirm the store is reachable.
    async fn health_check(&self) -> StoreResult<()>;
}
