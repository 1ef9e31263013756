//! # idsync: Identity Store Reconciliation
//!
//! Keeps the legacy document store (Store A) and the relational profile
//! store (Store B) converged on the same set of users.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         idsync Architecture                             │
//! │                                                                         │
//! │   control surface / main                                                │
//! │        │ start, stop, trigger_sync, status                              │
//! │        ▼                                                                │
//! │  ┌──────────────┐   tick / manual   ┌─────────────────────────┐        │
//! │  │ SyncScheduler│ ────────────────► │  ReconciliationEngine   │        │
//! │  │  timer task  │                   │   guard → fetch → diff  │        │
//! │  │  run history │ ◄──── SyncRun ─── │   → write → record      │        │
//! │  └──────────────┘                   └───────────┬─────────────┘        │
//! │                                                 │                       │
//! │                       ┌─────────────────────────┼──────────────┐       │
//! │                       ▼                         ▼              ▼       │
//! │              ┌─────────────────┐   ┌─────────────────┐ ┌────────────┐ │
//! │              │ dyn DocumentStore│  │ dyn ProfileStore│ │ SyncStats  │ │
//! │              │   (Store A)      │  │   (Store B)     │ │ Tracker    │ │
//! │              └─────────────────┘   └─────────────────┘ └────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//! ```rust,ignore
//! use std::sync::Arc;
//! use idsync::{ReconciliationEngine, SyncScheduler, SyncStatsTracker};
//! use idsync_db::{MemoryDocumentStore, MemoryProfileStore};
//!
//! let engine = ReconciliationEngine::new(
//!     Arc::new(MemoryDocumentStore::new()),
//!     Arc::new(MemoryProfileStore::new()),
//!     Arc::new(SyncStatsTracker::new()),
//! );
//! let scheduler = SyncScheduler::new(Arc::new(engine), 10);
//! scheduler.start(1).await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod stats;

pub use config::{SchedulerSettings, ServerSettings, SyncConfig};
pub use engine::ReconciliationEngine;
pub use error::{SyncError, SyncResult};
pub use scheduler::{RunHistory, SchedulerStatus, SyncScheduler};
pub use stats::{RunGuard, SyncStatsTracker};
