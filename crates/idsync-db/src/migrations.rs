//! # Store B Migrations
//!
//! Embedded SQL migrations for the `user_profiles` relation.
//!
//! In production the relation belongs to the managed backend and these
//! migrations stay off (`run_migrations = false`). Local and CI databases
//! turn them on.
//!
//! ## Adding New Migrations
//!
//! 1. Create a new file in `migrations/postgres/` with the next sequence number
//! 2. Name format: `NNN_description.sql`
//! 3. Write idempotent SQL (`IF NOT EXISTS`)
//! 4. **NEVER** modify existing migrations - always add new ones

use sqlx::PgPool;
use tracing::info;

use crate::error::StoreResult;

/// Embedded migrations from `migrations/postgres`.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/postgres");

/// Runs all pending migrations. Safe to run repeatedly.
pub async fn run_migrations(pool: &PgPool) -> StoreResult<()> {
    info!(
        total = MIGRATOR.migrations.len(),
        "Checking for pending profile store migrations"
    );

    MIGRATOR.run(pool).await?;

    info!("Profile store migrations applied");
    Ok(())
}
