//! # Store Error Types
//!
//! Error types for Store A and Store B operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  mongodb::error::Error            sqlx::Error                          │
//! │       │                                │                                │
//! │       └──────────────┬─────────────────┘                                │
//! │                      ▼                                                  │
//! │  StoreError (this module) ← Tags the store and categorizes             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncError (idsync) ← Adds pass context (fetch vs write, email)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncRun.error / ApiError ← What operators see                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;

/// Duplicate key error code returned by MongoDB.
const MONGO_DUPLICATE_KEY: i32 = 11000;

// =============================================================================
// Store Kind
// =============================================================================

/// Which of the two stores an error or log line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// Store A, the legacy document store.
    Document,
    /// Store B, the relational profile store.
    Profile,
}

impl StoreKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Document => "document store",
            StoreKind::Profile => "profile store",
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Store Error
// =============================================================================

/// Store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    ///
    /// ## When This Occurs
    /// - MongoDB server selection timed out
    /// - PostgreSQL pool timed out or was closed
    /// - DNS or socket failure
    #[error("{store} unreachable: {message}")]
    Connection { store: StoreKind, message: String },

    /// A read failed after the connection was established.
    #[error("{store} query failed: {message}")]
    Query { store: StoreKind, message: String },

    /// A write was rejected.
    ///
    /// ## When This Occurs
    /// - Constraint violation other than a duplicate key
    /// - Write concern not satisfied
    #[error("{store} write failed: {message}")]
    Write { store: StoreKind, message: String },

    /// Unique key violation (email already present).
    #[error("{store} duplicate key: {key}")]
    Duplicate { store: StoreKind, key: String },

    /// A stored record could not be mapped to the domain type.
    ///
    /// ## When This Occurs
    /// - Missing `_id` or `email`
    /// - Role outside `user | admin`
    /// - Malformed UUID in a cross-reference
    #[error("{store} decode failed for {id}: {reason}")]
    Decode {
        store: StoreKind,
        id: String,
        reason: String,
    },

    /// Targeted record does not exist.
    #[error("{store}: no record for {key}")]
    NotFound { store: StoreKind, key: String },

    /// Migration failed (Store B only).
    #[error("Migration failed: {0}")]
    Migration(String),
}

impl StoreError {
    /// Creates a Decode error.
    pub fn decode(store: StoreKind, id: impl Into<String>, reason: impl ToString) -> Self {
        StoreError::Decode {
            store,
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a NotFound error.
    pub fn not_found(store: StoreKind, key: impl Into<String>) -> Self {
        StoreError::NotFound {
            store,
            key: key.into(),
        }
    }

    /// True when the failure is about reaching the store, not the data.
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection { .. })
    }
}

/// Convert sqlx errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database (unique)  → StoreError::Duplicate
/// sqlx::Error::Database (other)   → StoreError::Write
/// Pool / Io / Tls / Configuration → StoreError::Connection
/// RowNotFound                     → StoreError::NotFound
/// Decode / ColumnDecode           → StoreError::Decode
/// Other                           → StoreError::Query
/// ```
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let store = StoreKind::Profile;
        match err {
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    StoreError::Duplicate {
                        store,
                        key: db_err.constraint().unwrap_or("email").to_string(),
                    }
                } else {
                    StoreError::Write {
                        store,
                        message: db_err.message().to_string(),
                    }
                }
            }

            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_) => StoreError::Connection {
                store,
                message: err.to_string(),
            },

            sqlx::Error::RowNotFound => StoreError::not_found(store, "row"),

            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::decode(store, "row", &err)
            }

            _ => StoreError::Query {
                store,
                message: err.to_string(),
            },
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(err.to_string())
    }
}

/// Convert MongoDB driver errors to StoreError.
impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        let store = StoreKind::Document;
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_err))
                if write_err.code == MONGO_DUPLICATE_KEY =>
            {
                StoreError::Duplicate {
                    store,
                    key: write_err.message.clone(),
                }
            }

            ErrorKind::Write(_) => StoreError::Write {
                store,
                message: err.to_string(),
            },

            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
            | ErrorKind::InvalidArgument { .. } => StoreError::Connection {
                store,
                message: err.to_string(),
            },

            ErrorKind::BsonDeserialization(_) => StoreError::decode(store, "document", &err),

            _ => StoreError::Query {
                store,
                message: err.to_string(),
            },
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
