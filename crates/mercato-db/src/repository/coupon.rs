//! Coupon repository: coupon rows plus the per-user usage counters.

use chrono::Utc;
use mercato_core::Coupon;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

const COUPON_COLUMNS: &str = "id, code, kind, value, max_discount_cents, min_purchase_cents, \
     starts_at, ends_at, usage_limit, per_user_limit, times_used, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a new coupon. Codes are unique.
    pub async fn insert(&self, coupon: &Coupon) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_with(&mut conn, coupon).await
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(coupon)
    }

    /// Looks up an active coupon by its (already normalized) code.
    ///
    /// Deactivated coupons are invisible here on purpose: callers report
    /// them as not found.
    pub async fn find_active_by_code(&self, code: &str) -> DbResult<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ?1 AND is_active = 1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(coupon)
    }

    /// Lists coupons, newest first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<Coupon>> {
        let coupons = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons ORDER BY created_at DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(coupons)
    }

    /// Activates or deactivates a coupon.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE coupons SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", id));
        }
        Ok(())
    }

    /// How many times this user has redeemed this coupon.
    pub async fn user_uses(&self, coupon_id: &str, user_id: &str) -> DbResult<i64> {
        let uses: Option<i64> =
            sqlx::query_scalar("SELECT uses FROM coupon_uses WHERE coupon_id = ?1 AND user_id = ?2")
                .bind(coupon_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(uses.unwrap_or(0))
    }

    /// Records one redemption: bumps the global counter and, when the use
    /// is attributable to a user, upserts the per-user counter.
    ///
    /// Called only after the consuming order has durably committed.
    pub async fn register_use(&self, coupon_id: &str, user_id: Option<&str>) -> DbResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("UPDATE coupons SET times_used = times_used + 1, updated_at = ?2 WHERE id = ?1")
                .bind(coupon_id)
                .bind(now)
                .execute(&mut *tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", coupon_id));
        }

        if let Some(user_id) = user_id {
            sqlx::query(
                r#"
                INSERT INTO coupon_uses (coupon_id, user_id, uses, updated_at)
                VALUES (?1, ?2, 1, ?3)
                ON CONFLICT(coupon_id, user_id) DO UPDATE
                SET uses = uses + 1, updated_at = excluded.updated_at
                "#,
            )
            .bind(coupon_id)
            .bind(user_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(coupon_id = %coupon_id, user_id = ?user_id, "coupon use registered");
        Ok(())
    }
}

/// Connection-level insert, shared with the redemption transaction.
pub(crate) async fn insert_with(conn: &mut SqliteConnection, coupon: &Coupon) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO coupons (id, code, kind, value, max_discount_cents, min_purchase_cents,
                             starts_at, ends_at, usage_limit, per_user_limit, times_used,
                             is_active, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&coupon.id)
    .bind(&coupon.code)
    .bind(coupon.kind)
    .bind(coupon.value)
    .bind(coupon.max_discount_cents)
    .bind(coupon.min_purchase_cents)
    .bind(coupon.starts_at)
    .bind(coupon.ends_at)
    .bind(coupon.usage_limit)
    .bind(coupon.per_user_limit)
    .bind(coupon.times_used)
    .bind(coupon.is_active)
    .bind(coupon.created_at)
    .bind(coupon.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;
    use mercato_core::DiscountKind;
    use uuid::Uuid;

    fn sample_coupon(code: &str) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            kind: DiscountKind::Percentage,
            value: 10,
            max_discount_cents: Some(500),
            min_purchase_cents: Some(2000),
            starts_at: None,
            ends_at: None,
            usage_limit: 0,
            per_user_limit: 1,
            times_used: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_active() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.coupons();

        let coupon = sample_coupon("SAVE10");
        repo.insert(&coupon).await.unwrap();

        let found = repo.find_active_by_code("SAVE10").await.unwrap().unwrap();
        assert_eq!(found.kind, DiscountKind::Percentage);
        assert_eq!(found.value, 10);
        assert_eq!(found.max_discount_cents, Some(500));

        assert!(repo.find_active_by_code("OTHER").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.coupons();

        repo.insert(&sample_coupon("SAVE10")).await.unwrap();
        let err = repo.insert(&sample_coupon("SAVE10")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_deactivated_coupon_is_invisible() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.coupons();

        let coupon = sample_coupon("SAVE10");
        repo.insert(&coupon).await.unwrap();
        repo.set_active(&coupon.id, false).await.unwrap();

        assert!(repo.find_active_by_code("SAVE10").await.unwrap().is_none());
        // Still reachable by id for administration.
        assert!(repo.get_by_id(&coupon.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_register_use_advances_both_counters() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.coupons();

        let coupon = sample_coupon("SAVE10");
        repo.insert(&coupon).await.unwrap();

        assert_eq!(repo.user_uses(&coupon.id, "user-1").await.unwrap(), 0);

        repo.register_use(&coupon.id, Some("user-1")).await.unwrap();
        repo.register_use(&coupon.id, Some("user-1")).await.unwrap();
        repo.register_use(&coupon.id, None).await.unwrap();

        let found = repo.get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(found.times_used, 3);
        assert_eq!(repo.user_uses(&coupon.id, "user-1").await.unwrap(), 2);
        assert_eq!(repo.user_uses(&coupon.id, "user-2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_register_use_unknown_coupon() {
        let db = Database::in_memory().await.unwrap();
        let err = db.coupons().register_use("missing", None).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
