//! # idsync-db: Store Adapters
//!
//! This crate provides access to the two user stores behind a pair of
//! async traits.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        idsync Data Flow                                 │
//! │                                                                         │
//! │  ReconciliationEngine (idsync)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    idsync-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │    store      │    │   document    │    │   profile    │  │   │
//! │  │   │   (traits)    │◄───│ MongoUserStore│    │PgProfileStore│  │   │
//! │  │   │               │◄───┼───────────────┼────│              │  │   │
//! │  │   │ DocumentStore │    │    memory     │    │  migrations  │  │   │
//! │  │   │ ProfileStore  │◄───│ Memory*Store  │    │ (embedded)   │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                        │                       │
//! │       ▼                                        ▼                       │
//! │  ┌──────────────────────┐            ┌──────────────────────┐          │
//! │  │ Store A: MongoDB     │            │ Store B: PostgreSQL  │          │
//! │  │ `users`              │            │ `user_profiles`      │          │
//! │  └──────────────────────┘            └──────────────────────┘          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use idsync_db::{MongoConfig, MongoUserStore, PgConfig, PgProfileStore};
//!
//! let users = MongoUserStore::connect(&MongoConfig::default()).await?;
//! let profiles = PgProfileStore::connect(&PgConfig::default()).await?;
//! let rows = profiles.fetch_all().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod document;
pub mod error;
pub mod memory;
pub mod migrations;
pub mod profile;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use document::{MongoConfig, MongoUserStore};
pub use error::{StoreError, StoreKind, StoreResult};
pub use memory::{MemoryDocumentStore, MemoryProfileStore};
pub use profile::{PgConfig, PgProfileStore};
pub use store::{DocumentStore, ProfileStore};
