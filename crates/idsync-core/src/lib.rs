//! # idsync-core: Pure Reconciliation Rules
//!
//! This crate holds the data model shared by both user stores and the rules
//! that decide what a reconciliation pass writes. It has zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        idsync Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               HTTP control surface (sync-server)                │   │
//! │  │    status, trigger, start, stop, reset-stats, logs              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │           idsync (engine + scheduler + stats)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ idsync-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                  │   │
//! │  │   │   types   │  │   diff    │  │ validation│                  │   │
//! │  │   │ Document  │  │ FieldDiff │  │  email    │                  │   │
//! │  │   │ Profile   │  │ Leader    │  │  interval │                  │   │
//! │  │   │ SyncRun   │  │ mapping   │  │           │                  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             idsync-db (MongoDB + PostgreSQL adapters)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - User shapes for both stores, `SyncRun`, `SyncStats`
//! - [`diff`] - Field-level diff, leader selection, cross-store mapping
//! - [`error`] - Domain error types
//! - [`validation`] - Email normalization and input checks
//!
//! ## Example Usage
//!
//! ```rust
//! use idsync_core::diff::diff_fields;
//! use idsync_core::types::{Role, UserFields};
//!
//! let leading = UserFields::new("Bob", Role::Admin, false);
//! let lagging = UserFields::new("Bob", Role::User, false);
//!
//! let diff = diff_fields(&leading, &lagging);
//! assert_eq!(diff.role, Some(Role::Admin));
//! assert!(diff.full_name.is_none());
//! assert!(diff.is_active.is_none());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod diff;
pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use diff::{backfill_name, diff_fields, leader_of, FieldDiff, Leader};
pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;
pub use validation::normalize_email;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default scheduler cadence in minutes.
pub const DEFAULT_INTERVAL_MINUTES: u64 = 1;

/// Number of finished runs kept for the `logs` view.
pub const DEFAULT_HISTORY_SIZE: usize = 10;
