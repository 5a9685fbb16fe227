//! Order repository.
//!
//! Creation, cancellation, proof rejection and point awards are
//! multi-statement writes; each runs in one transaction so a failure
//! unwinds every side effect, stock movements included.
//!
//! Status changes are guarded updates (`WHERE status = ...`). They return
//! `false` instead of erroring when the guard misses, and the service
//! layer turns that into the right conflict error from a fresh read.

use chrono::Utc;
use mercato_core::numbering::{order_number, ORDER_SEQUENCE};
use mercato_core::{Order, OrderItem, OrderStatus};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{loyalty, product, sequence};

const ORDER_COLUMNS: &str = "id, number, customer_id, user_id, status, payment_status, \
     payment_method, subtotal_cents, discount_cents, tax_cents, total_cents, coupon_code, \
     points_earned, transfer_reference, transfer_note, proof_submitted_at, proof_reviewed_by, \
     proof_reviewed_at, invoice_id, fiscal_data_json, delivered_at, cancel_reason, cancelled_at, \
     created_at, updated_at";

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates an order atomically: claims the next order number, writes
    /// the order row, then per line reserves stock and writes the item.
    ///
    /// Any failure (insufficient stock included) rolls the whole
    /// transaction back, order number claim included. Returns the order
    /// with its assigned number.
    pub async fn create(&self, draft: &Order, items: &[OrderItem]) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let seq = sequence::next_with(&mut tx, ORDER_SEQUENCE).await?;
        let mut order = draft.clone();
        order.number = order_number(draft.created_at.date_naive(), seq);

        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, \
             ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)"
        ))
        .bind(&order.id)
        .bind(&order.number)
        .bind(&order.customer_id)
        .bind(&order.user_id)
        .bind(order.status)
        .bind(order.payment_status)
        .bind(order.payment_method)
        .bind(order.subtotal_cents)
        .bind(order.discount_cents)
        .bind(order.tax_cents)
        .bind(order.total_cents)
        .bind(&order.coupon_code)
        .bind(order.points_earned)
        .bind(&order.transfer_reference)
        .bind(&order.transfer_note)
        .bind(order.proof_submitted_at)
        .bind(&order.proof_reviewed_by)
        .bind(order.proof_reviewed_at)
        .bind(&order.invoice_id)
        .bind(&order.fiscal_data_json)
        .bind(order.delivered_at)
        .bind(&order.cancel_reason)
        .bind(order.cancelled_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            product::reserve_stock_with(&mut tx, &item.product_id, item.quantity).await?;
            insert_item_with(&mut tx, item).await?;
        }

        tx.commit().await?;
        debug!(order_id = %order.id, number = %order.number, lines = items.len(), "order created");
        Ok(order)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order =
            sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(order)
    }

    /// Lines for an order, in insertion order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, name_snapshot, unit_price_cents, quantity,
                   line_total_cents, created_at
            FROM order_items
            WHERE order_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Lists orders, optionally filtered by status, newest first.
    pub async fn list(&self, status: Option<OrderStatus>, limit: i64) -> DbResult<Vec<Order>> {
        let orders = match status {
            Some(status) => {
                sqlx::query_as::<_, Order>(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ?1 \
                     ORDER BY created_at DESC LIMIT ?2"
                ))
                .bind(status)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Order>(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT ?1"
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(orders)
    }

    /// A user's own orders, newest first.
    pub async fn list_by_user(&self, user_id: &str, limit: i64) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1 \
             ORDER BY created_at DESC LIMIT ?2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    /// pending -> processing.
    pub async fn mark_processing(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE orders SET status = 'processing', updated_at = ?2 \
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// processing -> completed, stamping the delivery time.
    pub async fn complete(&self, id: &str) -> DbResult<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE orders SET status = 'completed', delivered_at = ?2, updated_at = ?2 \
             WHERE id = ?1 AND status = 'processing'",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Cancels a pending or processing order and releases every line's
    /// stock in the same transaction.
    pub async fn cancel(&self, id: &str, reason: Option<&str>) -> DbResult<bool> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE orders SET status = 'cancelled', cancel_reason = ?2, cancelled_at = ?3, \
             updated_at = ?3 WHERE id = ?1 AND status IN ('pending', 'processing')",
        )
        .bind(id)
        .bind(reason)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        release_items_with(&mut tx, id).await?;

        tx.commit().await?;
        debug!(order_id = %id, "order cancelled, stock released");
        Ok(true)
    }

    /// Attaches (or replaces) a transfer proof on a pending order.
    pub async fn attach_proof(
        &self,
        id: &str,
        reference: &str,
        note: Option<&str>,
    ) -> DbResult<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE orders SET transfer_reference = ?2, transfer_note = ?3, \
             proof_submitted_at = ?4, updated_at = ?4 \
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(id)
        .bind(reference)
        .bind(note)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Approves a transfer proof: payment confirmed, order starts
    /// processing. Requires an attached proof.
    pub async fn confirm_payment(&self, id: &str, reviewer: &str) -> DbResult<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE orders SET payment_status = 'confirmed', status = 'processing', \
             proof_reviewed_by = ?2, proof_reviewed_at = ?3, updated_at = ?3 \
             WHERE id = ?1 AND status = 'pending' AND transfer_reference IS NOT NULL",
        )
        .bind(id)
        .bind(reviewer)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Rejects a transfer proof: payment rejected, order cancelled with
    /// the given reason, stock released. One transaction.
    pub async fn reject_payment(&self, id: &str, reviewer: &str, reason: &str) -> DbResult<bool> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE orders SET payment_status = 'rejected', status = 'cancelled', \
             proof_reviewed_by = ?2, proof_reviewed_at = ?3, cancel_reason = ?4, \
             cancelled_at = ?3, updated_at = ?3 \
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(id)
        .bind(reviewer)
        .bind(now)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        release_items_with(&mut tx, id).await?;

        tx.commit().await?;
        debug!(order_id = %id, reviewer = %reviewer, "payment rejected, order cancelled");
        Ok(true)
    }

    /// Awards loyalty points exactly once per order.
    ///
    /// The `points_earned = 0` guard is the idempotency sentinel: only the
    /// call that flips it credits the account, so replayed completions
    /// cannot double-credit. Sentinel flip and credit share a transaction.
    pub async fn award_points(
        &self,
        id: &str,
        user_id: Option<&str>,
        points: i64,
    ) -> DbResult<bool> {
        if points <= 0 {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE orders SET points_earned = ?2, updated_at = ?3 \
             WHERE id = ?1 AND points_earned = 0",
        )
        .bind(id)
        .bind(points)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(user_id) = user_id {
            loyalty::credit_with(&mut tx, user_id, points).await?;
        }

        tx.commit().await?;
        debug!(order_id = %id, points, "loyalty points awarded");
        Ok(true)
    }

    /// Records the invoice issued for this order.
    pub async fn link_invoice(&self, order_id: &str, invoice_id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE orders SET invoice_id = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(order_id)
            .bind(invoice_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }
        Ok(())
    }
}

async fn insert_item_with(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_items (id, order_id, product_id, name_snapshot, unit_price_cents,
                                 quantity, line_total_cents, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.product_id)
    .bind(&item.name_snapshot)
    .bind(item.unit_price_cents)
    .bind(item.quantity)
    .bind(item.line_total_cents)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Releases stock for every line of an order, inside the caller's
/// transaction.
async fn release_items_with(conn: &mut SqliteConnection, order_id: &str) -> DbResult<()> {
    let lines: Vec<(String, i64)> =
        sqlx::query_as("SELECT product_id, quantity FROM order_items WHERE order_id = ?1")
            .bind(order_id)
            .fetch_all(&mut *conn)
            .await?;

    for (product_id, quantity) in lines {
        product::release_stock_with(conn, &product_id, quantity).await?;
    }
    Ok(())
}
