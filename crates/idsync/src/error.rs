//! # Sync Error Types
//!
//! Error types for reconciliation passes and scheduling.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Pass          │  │     Internal            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connectivity   │  │  Internal               │ │
//! │  │  InvalidInput   │  │  Write          │  │  (task panic, ...)      │ │
//! │  │  ConfigLoad     │  │  UserNotFound   │  │                         │ │
//! │  │  ConfigSave     │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A skipped pass is not an error: it is `SyncOutcome::Skipped`.

use idsync_core::ValidationError;
use idsync_db::{StoreError, StoreKind};
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised while running or scheduling reconciliation.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// A caller-supplied argument was rejected (malformed email, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // =========================================================================
    // Pass Errors
    // =========================================================================
    /// A full or single-user fetch failed.
    ///
    /// ## When This Occurs
    /// - Store unreachable at the start of a pass
    /// - The scan query itself was rejected
    #[error("Failed to read {store}: {source}")]
    Connectivity {
        store: StoreKind,
        #[source]
        source: StoreError,
    },

    /// A create or update failed. Earlier writes of the pass stay committed.
    #[error("Failed to write {email} to {store}: {source}")]
    Write {
        store: StoreKind,
        email: String,
        #[source]
        source: StoreError,
    },

    /// Single-user sync found the email in neither store.
    #[error("No user with email {0} in either store")]
    UserNotFound(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Wraps a fetch failure.
    pub fn read(store: StoreKind, source: StoreError) -> Self {
        SyncError::Connectivity { store, source }
    }

    /// Wraps a write failure for `email`.
    pub fn write(store: StoreKind, email: impl Into<String>, source: StoreError) -> Self {
        SyncError::Write {
            store,
            email: email.into(),
            source,
        }
    }

    /// Wraps a validation failure of a configuration value.
    pub fn config(err: ValidationError) -> Self {
        SyncError::InvalidConfig(err.to_string())
    }

    /// Wraps a validation failure of a caller-supplied value.
    pub fn input(err: ValidationError) -> Self {
        SyncError::InvalidInput(err.to_string())
    }

    /// True when the next scheduled pass may well succeed unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Connectivity { source, .. } | SyncError::Write { source, .. } => {
                source.is_connection()
            }
            _ => false,
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}
