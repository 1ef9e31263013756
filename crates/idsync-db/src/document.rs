//! # Store A: MongoDB `users` Collection
//!
//! Reads and writes the legacy user documents.
//!
//! ## Document Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  users                                                                  │
//! │  {                                                                      │
//! │    _id:        ObjectId        → DocumentUser.id (hex)                  │
//! │    email:      String          → join key                              │
//! │    fullName:   String ─┐                                                │
//! │    name:       String ─┼─────→ DocumentUser.full_name (first non-empty)│
//! │    profile: { firstName, lastName } ─┘                                  │
//! │    role:       "user"|"admin"  → missing means "user"                  │
//! │    isActive:   Bool            → missing means accountStatus, then true│
//! │    createdAt / updatedAt: Date                                          │
//! │    supabaseId: String (UUID)   → cross-reference, written only         │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Documents are decoded by hand rather than through serde so that the
//! fallbacks above stay explicit.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime, Document};
use mongodb::options::{ClientOptions, Collation, CollationStrength};
use mongodb::{Client, Collection, Database};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{StoreError, StoreKind, StoreResult};
use crate::store::DocumentStore;
use idsync_core::{normalize_email, DocumentPatch, DocumentUser, NewDocumentUser, Role};

const STORE: StoreKind = StoreKind::Document;

// =============================================================================
// Configuration
// =============================================================================

/// Store A connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    /// Connection string (`MONGODB_URI`).
    #[serde(default = "default_mongo_uri")]
    pub uri: String,

    #[serde(default = "default_mongo_database")]
    pub database: String,

    #[serde(default = "default_mongo_collection")]
    pub collection: String,

    /// How long the driver waits for a usable server before failing.
    #[serde(default = "default_server_selection_timeout")]
    pub server_selection_timeout_secs: u64,
}

fn default_mongo_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_mongo_database() -> String {
    "platform".to_string()
}

fn default_mongo_collection() -> String {
    "users".to_string()
}

fn default_server_selection_timeout() -> u64 {
    10
}

impl Default for MongoConfig {
    fn default() -> Self {
        MongoConfig {
            uri: default_mongo_uri(),
            database: default_mongo_database(),
            collection: default_mongo_collection(),
            server_selection_timeout_secs: default_server_selection_timeout(),
        }
    }
}

// =============================================================================
// Adapter
// =============================================================================

/// [`DocumentStore`] backed by a MongoDB collection.
#[derive(Debug, Clone)]
pub struct MongoUserStore {
    database: Database,
    users: Collection<Document>,
}

impl MongoUserStore {
    /// Builds the client. The driver connects lazily, so an unreachable
    /// server surfaces on the first operation, not here.
    pub async fn connect(config: &MongoConfig) -> StoreResult<Self> {
        info!(
            database = %config.database,
            collection = %config.collection,
            "Initializing document store client"
        );

        let mut options = ClientOptions::parse(&config.uri).await?;
        options.app_name = Some("idsync".to_string());
        options.server_selection_timeout =
            Some(Duration::from_secs(config.server_selection_timeout_secs));

        let client = Client::with_options(options)?;
        let database = client.database(&config.database);
        let users = database.collection::<Document>(&config.collection);

        Ok(MongoUserStore { database, users })
    }
}

#[async_trait]
impl DocumentStore for MongoUserStore {
    async fn fetch_all(&self) -> StoreResult<Vec<DocumentUser>> {
        let documents: Vec<Document> = self.users.find(doc! {}).await?.try_collect().await?;
        let users = decode_users(&documents);

        debug!(count = users.len(), "Fetched document store users");
        Ok(users)
    }

    async fn insert(&self, user: NewDocumentUser) -> StoreResult<String> {
        let document = doc! {
            "email": &user.email,
            "fullName": &user.full_name,
            "role": user.role.as_str(),
            "isActive": user.is_active,
            "createdAt": to_bson_datetime(user.created_at),
            "updatedAt": to_bson_datetime(user.updated_at),
            "supabaseId": user.supabase_id.to_string(),
        };

        let result = self.users.insert_one(document).await?;
        let id = match result.inserted_id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => other.to_string(),
        };

        debug!(email = %user.email, id = %id, "Inserted user document");
        Ok(id)
    }

    async fn update_by_id(&self, id: &str, patch: DocumentPatch) -> StoreResult<()> {
        let filter = match ObjectId::parse_str(id) {
            Ok(oid) => doc! { "_id": oid },
            Err(_) => doc! { "_id": id },
        };

        let mut set = doc! {
            "updatedAt": to_bson_datetime(patch.updated_at),
            "supabaseId": patch.supabase_id.to_string(),
        };
        if let Some(full_name) = &patch.full_name {
            set.insert("fullName", full_name.as_str());
        }
        if let Some(role) = patch.role {
            set.insert("role", role.as_str());
        }
        if let Some(is_active) = patch.is_active {
            set.insert("isActive", is_active);
        }

        let result = self.users.update_one(filter, doc! { "$set": set }).await?;
        if result.matched_count == 0 {
            return Err(StoreError::not_found(STORE, id));
        }

        debug!(id = %id, "Updated user document");
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<DocumentUser>> {
        // Secondary strength compares emails without regard to case.
        let collation = Collation::builder()
            .locale("en")
            .strength(CollationStrength::Secondary)
            .build();
        let email = normalize_email(email);
        self.users
            .find_one(doc! { "email": &email })
            .collation(collation)
            .await?
            .map(|document| decode_user(&document))
            .transpose()
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decodes a full scan, skipping documents that do not decode.
///
/// One bad document must not block every pass, so it is logged and left
/// out like a user without an email.
pub fn decode_users(documents: &[Document]) -> Vec<DocumentUser> {
    let mut users = Vec::with_capacity(documents.len());
    for document in documents {
        match decode_user(document) {
            Ok(user) => users.push(user),
            Err(e) => warn!(error = %e, "Skipping undecodable user document"),
        }
    }
    users
}

/// Maps a raw `users` document to a [`DocumentUser`].
///
/// A missing or blank email decodes to an empty string; the engine skips
/// such records.
pub fn decode_user(document: &Document) -> StoreResult<DocumentUser> {
    let id = match document.get("_id") {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::String(s)) => s.clone(),
        _ => return Err(StoreError::decode(STORE, "<unknown>", "missing _id")),
    };

    let email = document.get_str("email").unwrap_or_default().to_string();

    let role = Role::parse_optional(document.get_str("role").ok())
        .map_err(|e| StoreError::decode(STORE, id.as_str(), e))?;

    let is_active = match document.get_bool("isActive") {
        Ok(flag) => flag,
        Err(_) => document
            .get_str("accountStatus")
            .map(|status| status == "active")
            .unwrap_or(true),
    };

    let supabase_id = match document.get_str("supabaseId") {
        Ok(raw) if !raw.is_empty() => match Uuid::parse_str(raw) {
            Ok(uuid) => Some(uuid),
            Err(e) => {
                warn!(id = %id, error = %e, "Ignoring malformed supabaseId");
                None
            }
        },
        _ => None,
    };

    Ok(DocumentUser {
        full_name: decode_full_name(document),
        created_at: decode_datetime(document, "createdAt"),
        updated_at: decode_datetime(document, "updatedAt"),
        id,
        email,
        role,
        is_active,
        supabase_id,
    })
}

/// `fullName`, then `name`, then `profile.firstName lastName`.
fn decode_full_name(document: &Document) -> String {
    for key in ["fullName", "name"] {
        if let Ok(value) = document.get_str(key) {
            if !value.trim().is_empty() {
                return value.to_string();
            }
        }
    }

    document
        .get_document("profile")
        .map(|profile| {
            let first = profile.get_str("firstName").unwrap_or_default();
            let last = profile.get_str("lastName").unwrap_or_default();
            format!("{first} {last}").trim().to_string()
        })
        .unwrap_or_default()
}

fn decode_datetime(document: &Document, key: &str) -> Option<DateTime<Utc>> {
    document
        .get_datetime(key)
        .ok()
        .and_then(|dt| DateTime::from_timestamp_millis(dt.timestamp_millis()))
}

fn to_bson_datetime(value: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(value.timestamp_millis())
}
