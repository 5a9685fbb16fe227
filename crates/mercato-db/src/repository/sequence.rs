//! Named sequence counters.
//!
//! Document numbers come from the `sequences` table, advanced with a
//! single upsert that returns the new value. The row is created on first
//! use, so new keys (a new day's invoice counter, for example) need no
//! setup.

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Atomically increments the named counter and returns the new value.
    ///
    /// First call for a key returns 1.
    pub async fn next(&self, name: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        next_with(&mut conn, name).await
    }

    /// Reads the current value without advancing it. Missing keys read 0.
    pub async fn current(&self, name: &str) -> DbResult<i64> {
        let value: Option<i64> = sqlx::query_scalar("SELECT value FROM sequences WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value.unwrap_or(0))
    }
}

/// Connection-level increment, usable inside another transaction.
pub(crate) async fn next_with(conn: &mut SqliteConnection, name: &str) -> DbResult<i64> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO sequences (name, value)
        VALUES (?1, 1)
        ON CONFLICT(name) DO UPDATE SET value = value + 1
        RETURNING value
        "#,
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;

    #[tokio::test]
    async fn test_sequence_is_dense() {
        let db = Database::in_memory().await.unwrap();
        let sequences = db.sequences();

        assert_eq!(sequences.next("order").await.unwrap(), 1);
        assert_eq!(sequences.next("order").await.unwrap(), 2);
        assert_eq!(sequences.next("order").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_sequences_are_independent_per_key() {
        let db = Database::in_memory().await.unwrap();
        let sequences = db.sequences();

        assert_eq!(sequences.next("order").await.unwrap(), 1);
        assert_eq!(sequences.next("invoice:20240501").await.unwrap(), 1);
        assert_eq!(sequences.next("invoice:20240502").await.unwrap(), 1);
        assert_eq!(sequences.next("invoice:20240501").await.unwrap(), 2);
        assert_eq!(sequences.next("order").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_current_does_not_advance() {
        let db = Database::in_memory().await.unwrap();
        let sequences = db.sequences();

        assert_eq!(sequences.current("order").await.unwrap(), 0);
        sequences.next("order").await.unwrap();
        assert_eq!(sequences.current("order").await.unwrap(), 1);
        assert_eq!(sequences.current("order").await.unwrap(), 1);
    }
}
