//! # Store B: PostgreSQL `user_profiles`
//!
//! Reads and writes the relational profile rows.
//!
//! ## Query Plan
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  fetch_all        SELECT ... FROM user_profiles                        │
//! │  insert           INSERT ... RETURNING id                              │
//! │  update_by_email  UPDATE user_profiles SET <changed fields>,           │
//! │                          updated_at, mongo_id                          │
//! │                   WHERE <email key> = $n                               │
//! │  find_by_email    SELECT ... WHERE <email key> = $1                    │
//! │  health_check     SELECT 1                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The email key is `lower(btrim(email, <ASCII whitespace>))`, the SQL
//! form of `normalize_email`. The unique index uses the same expression.
//!
//! Nullable columns follow the same defaults as Store A: a null role is
//! `user`, a null `is_active` is active, a null name is empty.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{StoreError, StoreKind, StoreResult};
use crate::migrations;
use crate::store::ProfileStore;
use idsync_core::{normalize_email, NewProfileRow, ProfilePatch, ProfileRow, Role};

const STORE: StoreKind = StoreKind::Profile;

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, email, full_name, role, is_active,
        created_at, updated_at, mongo_id
    FROM user_profiles
"#;

/// SQL twin of `normalize_email`.
pub(crate) const EMAIL_KEY: &str = r"lower(btrim(email, E' \t\n\f\r'))";

// =============================================================================
// Configuration
// =============================================================================

/// Store B connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PgConfig {
    /// Connection string (`DATABASE_URL`).
    #[serde(default = "default_pg_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Pool acquire timeout.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Apply embedded migrations on connect.
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_pg_url() -> String {
    "postgres://localhost:5432/postgres".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for PgConfig {
    fn default() -> Self {
        PgConfig {
            url: default_pg_url(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
            run_migrations: false,
        }
    }
}

// =============================================================================
// Adapter
// =============================================================================

/// [`ProfileStore`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    /// Creates the pool. The pool connects lazily.
    pub async fn connect(config: &PgConfig) -> StoreResult<Self> {
        info!(
            max_connections = config.max_connections,
            run_migrations = config.run_migrations,
            "Initializing profile store pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_lazy(&config.url)?;

        if config.run_migrations {
            migrations::run_migrations(&pool).await?;
        }

        Ok(PgProfileStore { pool })
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        PgProfileStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn fetch_all(&self) -> StoreResult<Vec<ProfileRow>> {
        let records = sqlx::query_as::<_, ProfileRecord>(SELECT_COLUMNS)
            .fetch_all(&self.pool)
            .await?;

        let rows = decode_rows(records);

        debug!(count = rows.len(), "Fetched profile store rows");
        Ok(rows)
    }

    async fn insert(&self, row: NewProfileRow) -> StoreResult<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO user_profiles (
                email, full_name, role, is_active,
                created_at, updated_at, mongo_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&row.email)
        .bind(&row.full_name)
        .bind(row.role.as_str())
        .bind(row.is_active)
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(&row.mongo_id)
        .fetch_one(&self.pool)
        .await?;

        debug!(email = %row.email, id = %id, "Inserted profile row");
        Ok(id)
    }

    async fn update_by_email(&self, email: &str, patch: ProfilePatch) -> StoreResult<()> {
        let key = normalize_email(email);

        let result = update_query(key.clone(), patch)
            .build()
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(STORE, key));
        }

        debug!(email = %key, "Updated profile row");
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<ProfileRow>> {
        let sql = find_by_email_sql();
        sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?
            .map(ProfileRow::try_from)
            .transpose()
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// Query Construction
// =============================================================================

fn find_by_email_sql() -> String {
    format!("{SELECT_COLUMNS} WHERE {EMAIL_KEY} = $1")
}

/// `UPDATE` touching only the columns present in `patch`.
fn update_query(key: String, patch: ProfilePatch) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("UPDATE user_profiles SET updated_at = ");
    query.push_bind(patch.updated_at);
    query.push(", mongo_id = ").push_bind(patch.mongo_id);

    if let Some(full_name) = patch.full_name {
        query.push(", full_name = ").push_bind(full_name);
    }
    if let Some(role) = patch.role {
        query.push(", role = ").push_bind(role.as_str());
    }
    if let Some(is_active) = patch.is_active {
        query.push(", is_active = ").push_bind(is_active);
    }

    query.push(format!(" WHERE {EMAIL_KEY} = ")).push_bind(key);
    query
}

// =============================================================================
// Record Types
// =============================================================================

/// Raw `user_profiles` row as the driver returns it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRecord {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub mongo_id: Option<String>,
}

/// Converts a full scan, skipping rows that do not decode.
fn decode_rows(records: Vec<ProfileRecord>) -> Vec<ProfileRow> {
    records
        .into_iter()
        .filter_map(|record| match ProfileRow::try_from(record) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable profile row");
                None
            }
        })
        .collect()
}

impl TryFrom<ProfileRecord> for ProfileRow {
    type Error = StoreError;

    fn try_from(record: ProfileRecord) -> Result<Self, Self::Error> {
        let role = Role::parse_optional(record.role.as_deref())
            .map_err(|e| StoreError::decode(STORE, record.id.to_string(), e))?;

        Ok(ProfileRow {
            id: record.id,
            email: record.email.unwrap_or_default(),
            full_name: record.full_name.unwrap_or_default(),
            role,
            is_active: record.is_active.unwrap_or(true),
            created_at: record.created_at,
            updated_at: record.updated_at,
            mongo_id: record.mongo_id.filter(|id| !id.is_empty()),
        })
    }
}
