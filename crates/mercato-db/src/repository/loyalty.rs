//! Loyalty repository: point balances with guarded debits.
//!
//! Accounts are created lazily by the first credit. Redemption debits the
//! balance and mints the resulting coupon inside one transaction so a
//! failure can never leave a coupon without its paid-for points.

use chrono::Utc;
use mercato_core::{Coupon, LoyaltyAccount};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::coupon;

#[derive(Debug, Clone)]
pub struct LoyaltyRepository {
    pool: SqlitePool,
}

impl LoyaltyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: &str) -> DbResult<Option<LoyaltyAccount>> {
        let account = sqlx::query_as::<_, LoyaltyAccount>(
            "SELECT user_id, points, lifetime_points, updated_at FROM loyalty_accounts WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    /// Fetches the account, or an empty one for users yet to earn points.
    pub async fn get_or_default(&self, user_id: &str) -> DbResult<LoyaltyAccount> {
        Ok(self
            .get(user_id)
            .await?
            .unwrap_or_else(|| LoyaltyAccount::empty(user_id, Utc::now())))
    }

    /// Credits points, creating the account on first use.
    pub async fn credit(&self, user_id: &str, points: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        credit_with(&mut conn, user_id, points).await
    }

    /// Debits points, failing if the balance cannot cover the spend.
    pub async fn debit(&self, user_id: &str, points: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        debit_with(&mut conn, user_id, points).await
    }

    /// Redemption: debit the balance and mint the coupon atomically.
    pub async fn redeem(&self, user_id: &str, points: i64, minted: &Coupon) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        debit_with(&mut tx, user_id, points).await?;
        coupon::insert_with(&mut tx, minted).await?;

        tx.commit().await?;
        debug!(user_id = %user_id, points, code = %minted.code, "points redeemed");
        Ok(())
    }
}

/// Upsert credit; lifetime points advance in step.
pub(crate) async fn credit_with(
    conn: &mut SqliteConnection,
    user_id: &str,
    points: i64,
) -> DbResult<()> {
    if points <= 0 {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO loyalty_accounts (user_id, points, lifetime_points, updated_at)
        VALUES (?1, ?2, ?2, ?3)
        ON CONFLICT(user_id) DO UPDATE
        SET points = points + excluded.points,
            lifetime_points = lifetime_points + excluded.points,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(points)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    debug!(user_id = %user_id, points, "points credited");
    Ok(())
}

/// Balance-guarded debit. Lifetime points are untouched by spending.
pub(crate) async fn debit_with(
    conn: &mut SqliteConnection,
    user_id: &str,
    points: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE loyalty_accounts
        SET points = points - ?2, updated_at = ?3
        WHERE user_id = ?1 AND points >= ?2
        "#,
    )
    .bind(user_id)
    .bind(points)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let available: Option<i64> =
            sqlx::query_scalar("SELECT points FROM loyalty_accounts WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(&mut *conn)
                .await?;

        return Err(DbError::InsufficientPoints {
            user_id: user_id.to_string(),
            available: available.unwrap_or(0),
            requested: points,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;

    #[tokio::test]
    async fn test_credit_creates_account() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.loyalty();

        assert!(repo.get("user-1").await.unwrap().is_none());

        repo.credit("user-1", 150).await.unwrap();
        let account = repo.get("user-1").await.unwrap().unwrap();
        assert_eq!(account.points, 150);
        assert_eq!(account.lifetime_points, 150);
    }

    #[tokio::test]
    async fn test_credit_accumulates() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.loyalty();

        repo.credit("user-1", 100).await.unwrap();
        repo.credit("user-1", 50).await.unwrap();

        let account = repo.get("user-1").await.unwrap().unwrap();
        assert_eq!(account.points, 150);
        assert_eq!(account.lifetime_points, 150);
    }

    #[tokio::test]
    async fn test_zero_credit_is_noop() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.loyalty();

        repo.credit("user-1", 0).await.unwrap();
        assert!(repo.get("user-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_debit_leaves_lifetime_points() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.loyalty();

        repo.credit("user-1", 200).await.unwrap();
        repo.debit("user-1", 150).await.unwrap();

        let account = repo.get("user-1").await.unwrap().unwrap();
        assert_eq!(account.points, 50);
        assert_eq!(account.lifetime_points, 200);
    }

    #[tokio::test]
    async fn test_debit_guard_reports_available() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.loyalty();

        repo.credit("user-1", 120).await.unwrap();
        let err = repo.debit("user-1", 150).await.unwrap_err();
        match err {
            DbError::InsufficientPoints {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 120);
                assert_eq!(requested, 150);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Balance untouched after the failed debit.
        assert_eq!(repo.get("user-1").await.unwrap().unwrap().points, 120);
    }

    #[tokio::test]
    async fn test_debit_missing_account() {
        let db = Database::in_memory().await.unwrap();
        let err = db.loyalty().debit("ghost", 10).await.unwrap_err();
        match err {
            DbError::InsufficientPoints { available, .. } => assert_eq!(available, 0),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_redeem_is_atomic() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.loyalty();

        repo.credit("user-1", 200).await.unwrap();

        let now = Utc::now();
        let minted = Coupon::single_use_fixed("PUNTOS-DEADBEEF".to_string(), 150, now, 30);
        repo.redeem("user-1", 150, &minted).await.unwrap();

        assert_eq!(repo.get("user-1").await.unwrap().unwrap().points, 50);
        assert!(db
            .coupons()
            .find_active_by_code("PUNTOS-DEADBEEF")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_failed_redeem_mints_nothing() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.loyalty();

        repo.credit("user-1", 100).await.unwrap();

        let now = Utc::now();
        let minted = Coupon::single_use_fixed("PUNTOS-CAFEBABE".to_string(), 150, now, 30);
        let err = repo.redeem("user-1", 150, &minted).await.unwrap_err();
        assert!(matches!(err, DbError::InsufficientPoints { .. }));

        // The transaction rolled back: no coupon, full balance.
        assert!(db
            .coupons()
            .find_active_by_code("PUNTOS-CAFEBABE")
            .await
            .unwrap()
            .is_none());
        assert_eq!(repo.get("user-1").await.unwrap().unwrap().points, 100);
    }
}
