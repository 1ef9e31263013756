//! # Diff Module
//!
//! Decides what a reconciliation pass writes for one logical user.
//!
//! ## Decision Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Per-User Decision                                    │
//! │                                                                         │
//! │   in A   in B   leader     A → B pass            B → A pass            │
//! │   ────   ────   ──────     ──────────────        ──────────────        │
//! │    ✓      ✗       -        insert into B         -                     │
//! │    ✗      ✓       -        -                     insert into A         │
//! │    ✓      ✓       A        diff(A, B) → B        name(B, A) → A        │
//! │    ✓      ✓       B        name(A, B) → B        diff(B, A) → A        │
//! │                                                                         │
//! │   diff  = every field of the leader that differs, except a blank name  │
//! │   name  = the lagger's name, only when the leader's name is blank      │
//! │   Empty diff → no write. Each store is written at most once per pair.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A name is never blanked, so a blank name on the leader is filled from
//! the lagger in the same pass. After one pass both sides agree on every
//! field and the next pass writes nothing.
//!
//! ## Leader Selection
//! The record with the newer `updated_at` leads. A record without one is
//! older than any record that has one. Ties go to Store B.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{
    DocumentPatch, DocumentUser, NewDocumentUser, NewProfileRow, ProfilePatch, ProfileRow, Role,
    UserFields,
};
use crate::validation::normalize_email;

// =============================================================================
// Field Diff
// =============================================================================

/// Fields that must change on the lagging side. `None` means unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDiff {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl FieldDiff {
    /// True when nothing needs writing.
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.role.is_none() && self.is_active.is_none()
    }

    /// Names of the changed fields, for logging.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::with_capacity(3);
        if self.full_name.is_some() {
            fields.push("full_name");
        }
        if self.role.is_some() {
            fields.push("role");
        }
        if self.is_active.is_some() {
            fields.push("is_active");
        }
        fields
    }

    /// Turns the diff into a Store B update carrying the A cross-reference.
    pub fn into_profile_patch(self, mongo_id: String, now: DateTime<Utc>) -> ProfilePatch {
        ProfilePatch {
            full_name: self.full_name,
            role: self.role,
            is_active: self.is_active,
            updated_at: now,
            mongo_id,
        }
    }

    /// Turns the diff into a Store A update carrying the B cross-reference.
    pub fn into_document_patch(self, supabase_id: Uuid, now: DateTime<Utc>) -> DocumentPatch {
        DocumentPatch {
            full_name: self.full_name,
            role: self.role,
            is_active: self.is_active,
            updated_at: now,
            supabase_id,
        }
    }
}

/// Compares the leading record's fields against the lagging record's.
///
/// An empty source name never blanks the target.
pub fn diff_fields(source: &UserFields, target: &UserFields) -> FieldDiff {
    let full_name = (!source.full_name.trim().is_empty() && source.full_name != target.full_name)
        .then(|| source.full_name.clone());

    FieldDiff {
        full_name,
        role: (source.role != target.role).then_some(source.role),
        is_active: (source.is_active != target.is_active).then_some(source.is_active),
    }
}

/// Fills a blank name on the leading record from the lagging one.
///
/// Only `full_name` can be set; the leader's other fields already win.
pub fn backfill_name(leading: &UserFields, lagging: &UserFields) -> FieldDiff {
    let full_name = (leading.full_name.trim().is_empty() && !lagging.full_name.trim().is_empty())
        .then(|| lagging.full_name.clone());

    FieldDiff {
        full_name,
        ..FieldDiff::default()
    }
}

// =============================================================================
// Leader Selection
// =============================================================================

/// Which store's copy of a pair is authoritative for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leader {
    /// Store A leads; Store B gets updated.
    Document,
    /// Store B leads; Store A gets updated.
    Profile,
}

/// Picks the leader of a pair from the two `updated_at` values.
pub fn leader_of(document_updated: Option<DateTime<Utc>>, profile_updated: Option<DateTime<Utc>>) -> Leader {
    match (document_updated, profile_updated) {
        (Some(a), Some(b)) if a > b => Leader::Document,
        (Some(_), None) => Leader::Document,
        _ => Leader::Profile,
    }
}

// =============================================================================
// Cross-Store Mapping
// =============================================================================

/// Builds the Store B row for a user only present in Store A.
pub fn new_profile_from_document(user: &DocumentUser, now: DateTime<Utc>) -> NewProfileRow {
    NewProfileRow {
        email: normalize_email(&user.email),
        full_name: user.full_name.clone(),
        role: user.role,
        is_active: user.is_active,
        created_at: user.created_at.unwrap_or(now),
        updated_at: now,
        mongo_id: user.id.clone(),
    }
}

/// Builds the Store A document for a user only present in Store B.
pub fn new_document_from_profile(row: &ProfileRow, now: DateTime<Utc>) -> NewDocumentUser {
    NewDocumentUser {
        email: normalize_email(&row.email),
        full_name: row.full_name.clone(),
        role: row.role,
        is_active: row.is_active,
        created_at: row.created_at.unwrap_or(now),
        updated_at: now,
        supabase_id: row.id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn fields(name: &str, role: Role, active: bool) -> UserFields {
        UserFields::new(name, role, active)
    }

    #[test]
    fn test_identical_fields_produce_empty_diff() {
        let a = fields("Alice", Role::User, true);
        let diff = diff_fields(&a, &a.clone());
        assert!(diff.is_empty());
        assert!(diff.changed_fields().is_empty());
    }

    #[test]
    fn test_diff_only_changed_fields() {
        let source = fields("Bob", Role::Admin, false);
        let target = fields("Bob", Role::User, false);

        let diff = diff_fields(&source, &target);
        assert_eq!(diff.full_name, None);
        assert_eq!(diff.role, Some(Role::Admin));
        assert_eq!(diff.is_active, None);
        assert_eq!(diff.changed_fields(), vec!["role"]);
    }

    #[test]
    fn test_empty_source_name_does_not_blank_target() {
        let source = fields("  ", Role::User, true);
        let target = fields("Carol", Role::User, true);
        assert!(diff_fields(&source, &target).is_empty());

        let source = fields("Carol B.", Role::User, true);
        assert_eq!(
            diff_fields(&source, &target).full_name.as_deref(),
            Some("Carol B.")
        );
    }

    #[test]
    fn test_backfill_name_only_fills_blank_leader() {
        let leading = fields("", Role::Admin, true);
        let lagging = fields("Alice", Role::User, false);

        let diff = backfill_name(&leading, &lagging);
        assert_eq!(diff.full_name.as_deref(), Some("Alice"));
        assert_eq!(diff.changed_fields(), vec!["full_name"]);

        let named = fields("Alicia", Role::Admin, true);
        assert!(backfill_name(&named, &lagging).is_empty());
        assert!(backfill_name(&leading, &fields(" ", Role::User, true)).is_empty());
    }

    #[test]
    fn test_leader_selection() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(5);

        assert_eq!(leader_of(Some(t1), Some(t0)), Leader::Document);
        assert_eq!(leader_of(Some(t0), Some(t1)), Leader::Profile);
        assert_eq!(leader_of(Some(t0), Some(t0)), Leader::Profile);
        assert_eq!(leader_of(Some(t0), None), Leader::Document);
        assert_eq!(leader_of(None, Some(t0)), Leader::Profile);
        assert_eq!(leader_of(None, None), Leader::Profile);
    }

    #[test]
    fn test_patch_carries_cross_reference() {
        let now = Utc::now();
        let diff = FieldDiff {
            is_active: Some(false),
            ..Default::default()
        };

        let patch = diff.clone().into_profile_patch("64b0c0ffee".to_string(), now);
        assert_eq!(patch.mongo_id, "64b0c0ffee");
        assert_eq!(patch.is_active, Some(false));
        assert_eq!(patch.updated_at, now);

        let id = Uuid::new_v4();
        let patch = diff.into_document_patch(id, now);
        assert_eq!(patch.supabase_id, id);
        assert!(patch.full_name.is_none());
    }

    #[test]
    fn test_new_profile_from_document() {
        let now = Utc::now();
        let created = now - Duration::days(30);
        let user = DocumentUser {
            id: "65a1b2c3d4e5f60718293a4b".to_string(),
            email: "Alice@Example.com".to_string(),
            full_name: "Alice".to_string(),
            role: Role::Admin,
            is_active: true,
            created_at: Some(created),
            updated_at: None,
            supabase_id: None,
        };

        let row = new_profile_from_document(&user, now);
        assert_eq!(row.email, "alice@example.com");
        assert_eq!(row.role, Role::Admin);
        assert_eq!(row.created_at, created);
        assert_eq!(row.updated_at, now);
        assert_eq!(row.mongo_id, user.id);
    }

    #[test]
    fn test_new_document_from_profile_defaults_created_at() {
        let now = Utc::now();
        let row = ProfileRow {
            id: Uuid::new_v4(),
            email: "dave@x.com".to_string(),
            full_name: String::new(),
            role: Role::User,
            is_active: false,
            created_at: None,
            updated_at: None,
            mongo_id: None,
        };

        let doc = new_document_from_profile(&row, now);
        assert_eq!(doc.created_at, now);
        assert_eq!(doc.supabase_id, row.id);
        assert!(!doc.is_active);
    }
}
