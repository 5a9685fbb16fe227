//! Embedded database migrations.
//!
//! SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied in order on startup. sqlx tracks applied versions in the
//! `_sqlx_migrations` table.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

/// Compile-time embedded migrator.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies all pending migrations.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!("running database migrations");
    MIGRATOR.run(pool).await?;
    info!("database migrations up to date");
    Ok(())
}

/// Returns (total known migrations, applied migrations).
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .unwrap_or(0);
    Ok((total, applied as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;

    #[tokio::test]
    async fn test_migrations_apply_cleanly() {
        let db = Database::in_memory().await.unwrap();
        let (total, applied) = migration_status(db.pool()).await.unwrap();
        assert!(total >= 2);
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::in_memory().await.unwrap();
        // Second run is a no-op.
        run_migrations(db.pool()).await.unwrap();
        let (total, applied) = migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }
}
