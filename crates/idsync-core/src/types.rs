//! # Domain Types
//!
//! The same logical user has a different physical shape in each store.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐             ┌─────────────────────┐            │
//! │  │ DocumentUser (A)    │             │ ProfileRow (B)      │            │
//! │  │  ─────────────────  │   email     │  ─────────────────  │            │
//! │  │  _id (ObjectId hex) │◄──(join)───►│  id (UUID)          │            │
//! │  │  email              │             │  email              │            │
//! │  │  fullName | name    │             │  full_name          │            │
//! │  │  role               │             │  role               │            │
//! │  │  isActive           │             │  is_active          │            │
//! │  │  supabaseId ────────┼──xref──────►│                     │            │
//! │  │                     │◄──xref──────┼─ mongo_id           │            │
//! │  └─────────────────────┘             └─────────────────────┘            │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    SyncRun      │   │   SyncCounts    │   │   SyncStats     │       │
//! │  │  one per pass   │   │  created/updated│   │  cumulative,    │       │
//! │  │  outcome, error │   │  per direction  │   │  per process    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cross-reference ids (`supabase_id`, `mongo_id`) are written for
//! traceability only. Email is always the join key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::validation::normalize_email;

// =============================================================================
// Role
// =============================================================================

/// Closed set of platform roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular customer account.
    #[default]
    User,

    /// Administrator.
    Admin,
}

impl Role {
    /// Returns the stored string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parses an optional stored role; absent or blank means `user`.
    pub fn parse_optional(value: Option<&str>) -> CoreResult<Self> {
        match value.map(str::trim) {
            None | Some("") => Ok(Role::User),
            Some(s) => s.parse(),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }
}

// =============================================================================
// Logical User Fields
// =============================================================================

/// The attributes compared during a pass, independent of store shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFields {
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
}

impl UserFields {
    /// Creates a field set.
    pub fn new(full_name: impl Into<String>, role: Role, is_active: bool) -> Self {
        UserFields {
            full_name: full_name.into(),
            role,
            is_active,
        }
    }
}

// =============================================================================
// Store A: DocumentUser
// =============================================================================

/// A user document from the legacy document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUser {
    /// Native id (`_id` ObjectId, hex encoded).
    pub id: String,

    /// Email as stored (join key after normalization).
    pub email: String,

    /// `fullName`, falling back to `name` when the document predates it.
    pub full_name: String,

    pub role: Role,

    pub is_active: bool,

    pub created_at: Option<DateTime<Utc>>,

    pub updated_at: Option<DateTime<Utc>>,

    /// Cross-reference to the Store B row id.
    pub supabase_id: Option<Uuid>,
}

impl DocumentUser {
    /// Returns the compared attributes.
    pub fn fields(&self) -> UserFields {
        UserFields::new(self.full_name.clone(), self.role, self.is_active)
    }

    /// Returns the normalized join key.
    pub fn email_key(&self) -> String {
        normalize_email(&self.email)
    }
}

/// A document to insert into Store A.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocumentUser {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Store B row this document mirrors.
    pub supabase_id: Uuid,
}

/// A partial update for one Store A document.
///
/// Only `Some` fields are written; `updated_at` and the cross-reference
/// are always written.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPatch {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub updated_at: DateTime<Utc>,
    pub supabase_id: Uuid,
}

// =============================================================================
// Store B: ProfileRow
// =============================================================================

/// A row from the relational `user_profiles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRow {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Cross-reference to the Store A document id.
    pub mongo_id: Option<String>,
}

impl ProfileRow {
    /// Returns the compared attributes.
    pub fn fields(&self) -> UserFields {
        UserFields::new(self.full_name.clone(), self.role, self.is_active)
    }

    /// Returns the normalized join key.
    pub fn email_key(&self) -> String {
        normalize_email(&self.email)
    }
}

/// A row to insert into Store B. The store assigns `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProfileRow {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Store A document this row mirrors.
    pub mongo_id: String,
}

/// A partial update for one Store B row, addressed by email.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub updated_at: DateTime<Utc>,
    pub mongo_id: String,
}

// =============================================================================
// Sync Run
// =============================================================================

/// What started a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    /// Scheduler timer tick (including the immediate first run).
    Scheduled,

    /// Out-of-band `trigger_sync` call.
    Manual,

    /// Reconciliation of a single email.
    SingleUser,
}

impl std::fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncTrigger::Scheduled => write!(f, "scheduled"),
            SyncTrigger::Manual => write!(f, "manual"),
            SyncTrigger::SingleUser => write!(f, "single_user"),
        }
    }
}

/// Result of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Both directions were walked without error.
    Completed,

    /// A fetch or a write failed; earlier writes stay committed.
    Failed,

    /// Another pass was in flight. Nothing was read or written.
    Skipped,
}

/// Per-direction write counts for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCounts {
    pub created_in_a: u64,
    pub created_in_b: u64,
    pub updated_in_a: u64,
    pub updated_in_b: u64,
    /// Store A users walked in the A → B direction.
    pub total_processed: u64,
}

impl SyncCounts {
    /// Total writes issued to either store.
    pub fn writes(&self) -> u64 {
        self.created_in_a + self.created_in_b + self.updated_in_a + self.updated_in_b
    }
}

/// Record of one engine invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRun {
    pub run_id: Uuid,
    pub trigger: SyncTrigger,
    pub outcome: SyncOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// On a failed run these are the writes committed before the failure.
    pub counts: SyncCounts,
    pub error: Option<String>,
}

impl SyncRun {
    /// Builds the record returned when the guard rejects a call.
    pub fn skipped(trigger: SyncTrigger) -> Self {
        let now = Utc::now();
        SyncRun {
            run_id: Uuid::new_v4(),
            trigger,
            outcome: SyncOutcome::Skipped,
            started_at: now,
            finished_at: now,
            duration_ms: 0,
            counts: SyncCounts::default(),
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == SyncOutcome::Completed
    }

    pub fn is_skipped(&self) -> bool {
        self.outcome == SyncOutcome::Skipped
    }
}

// =============================================================================
// Sync Stats
// =============================================================================

/// Cumulative counters for the process. Not persisted across restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub total_syncs: u64,
    pub successful_syncs: u64,
    pub errors: u64,
    pub last_error: Option<String>,
    /// End of the last non-skipped pass, successful or not.
    pub last_sync_time: Option<DateTime<Utc>>,
    /// End of the last successful pass.
    pub last_success_time: Option<DateTime<Utc>>,
    /// True only while a pass is in flight.
    pub is_running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!(" Admin ".parse::<Role>().unwrap(), Role::Admin);
        assert!("owner".parse::<Role>().is_err());

        assert_eq!(Role::parse_optional(None).unwrap(), Role::User);
        assert_eq!(Role::parse_optional(Some("  ")).unwrap(), Role::User);
        assert_eq!(Role::parse_optional(Some("admin")).unwrap(), Role::Admin);
    }

    #[test]
    fn test_role_serde_is_lowercase() {
        let json = serde_json::to_string(&Role::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
    }

    #[test]
    fn test_counts_serialize_camel_case() {
        let counts = SyncCounts {
            created_in_b: 1,
            total_processed: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json["createdInB"], 1);
        assert_eq!(json["totalProcessed"], 1);
        assert_eq!(counts.writes(), 1);
    }

    #[test]
    fn test_skipped_run() {
        let run = SyncRun::skipped(SyncTrigger::Manual);
        assert!(run.is_skipped());
        assert!(!run.is_success());
        assert_eq!(run.counts, SyncCounts::default());
        assert!(run.error.is_none());
    }

    #[test]
    fn test_email_key_is_normalized() {
        let user = ProfileRow {
            id: Uuid::new_v4(),
            email: " Alice@Example.COM ".to_string(),
            full_name: "Alice".to_string(),
            role: Role::User,
            is_active: true,
            created_at: None,
            updated_at: None,
            mongo_id: None,
        };
        assert_eq!(user.email_key(), "alice@example.com");
    }
}
