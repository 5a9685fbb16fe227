//! Database connection pool management.
//!
//! Owns the SQLite pool and hands out repositories. SQLite runs in WAL
//! mode with foreign keys on; a busy timeout keeps concurrent writers
//! queueing instead of failing fast.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{
    CouponRepository, CustomerRepository, InvoiceRepository, LoyaltyRepository, OrderRepository,
    ProductRepository, SequenceRepository,
};

// ============================================================================
// Configuration
// ============================================================================

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file, or ":memory:".
    pub database_path: PathBuf,
    /// Maximum number of pooled connections.
    pub max_connections: u32,
    /// Minimum number of idle connections to keep.
    pub min_connections: u32,
    /// How long to wait for a connection before giving up.
    pub connect_timeout: Duration,
    /// How long an idle connection may linger before being closed.
    pub idle_timeout: Duration,
    /// Apply pending migrations on startup.
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a configuration for a file-backed database.
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Creates a configuration for an in-memory database.
    ///
    /// Single connection: each SQLite in-memory connection is its own
    /// database, so pooling more than one would split the data.
    pub fn in_memory() -> Self {
        Self {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn without_migrations(mut self) -> Self {
        self.run_migrations = false;
        self
    }
}

// ============================================================================
// Database Handle
// ============================================================================

/// Shared database handle.
///
/// Cheap to clone; all clones share one pool. Repositories are
/// constructed on demand from the accessor methods.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the database, configures SQLite and runs migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let url = format!("sqlite://{}?mode=rwc", config.database_path.display());
        debug!(url = %url, "opening database");

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        if config.run_migrations {
            migrations::run_migrations(&pool).await?;
        }

        info!(path = %config.database_path.display(), "database ready");
        Ok(Self { pool })
    }

    /// Opens a fresh in-memory database. Used heavily by tests.
    pub async fn in_memory() -> DbResult<Self> {
        Self::new(DbConfig::in_memory()).await
    }

    /// Returns the underlying pool for custom queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ------------------------------------------------------------------------
    // Repository Accessors
    // ------------------------------------------------------------------------

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn coupons(&self) -> CouponRepository {
        CouponRepository::new(self.pool.clone())
    }

    pub fn loyalty(&self) -> LoyaltyRepository {
        LoyaltyRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    pub fn sequences(&self) -> SequenceRepository {
        SequenceRepository::new(self.pool.clone())
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Verifies the database answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Closes the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::in_memory().await.unwrap();
        assert!(db.health_check().await);
        db.close().await;
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/mercato.db")
            .with_max_connections(10)
            .without_migrations();

        assert_eq!(config.max_connections, 10);
        assert!(!config.run_migrations);
        assert_eq!(config.database_path, PathBuf::from("/tmp/mercato.db"));
    }

    #[test]
    fn test_in_memory_config_single_connection() {
        let config = DbConfig::in_memory();
        assert_eq!(config.max_connections, 1);
    }
}
