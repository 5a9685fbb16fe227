//! Invoice repository.
//!
//! Numbers come from a per-day sequence key, claimed inside the creation
//! transaction. UNIQUE(order_id) backs the one-invoice-per-order rule at
//! the storage level.

use chrono::Utc;
use mercato_core::numbering::{invoice_number, invoice_sequence_key};
use mercato_core::{Invoice, InvoiceItem, InvoiceStatus};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::sequence;

const INVOICE_COLUMNS: &str = "id, number, order_id, customer_id, fiscal_name, fiscal_tax_id, \
     fiscal_address, fiscal_email, fiscal_phone, subtotal_cents, discount_cents, tax_cents, \
     total_cents, payment_method, status, issued_at, paid_at, voided_at, void_reason";

/// Aggregate figures across all invoices.
///
/// Voided invoices count toward nothing but their own tally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvoiceStats {
    pub issued_count: i64,
    pub paid_count: i64,
    pub voided_count: i64,
    pub total_invoiced_cents: i64,
    pub total_paid_cents: i64,
}

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates an invoice with its items, claiming the day's next number
    /// in the same transaction. Returns the invoice with its number.
    pub async fn create(&self, draft: &Invoice, items: &[InvoiceItem]) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;

        let date = draft.issued_at.date_naive();
        let seq = sequence::next_with(&mut tx, &invoice_sequence_key(date)).await?;
        let mut invoice = draft.clone();
        invoice.number = invoice_number(date, seq);

        sqlx::query(&format!(
            "INSERT INTO invoices ({INVOICE_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, \
             ?18, ?19)"
        ))
        .bind(&invoice.id)
        .bind(&invoice.number)
        .bind(&invoice.order_id)
        .bind(&invoice.customer_id)
        .bind(&invoice.fiscal_name)
        .bind(&invoice.fiscal_tax_id)
        .bind(&invoice.fiscal_address)
        .bind(&invoice.fiscal_email)
        .bind(&invoice.fiscal_phone)
        .bind(invoice.subtotal_cents)
        .bind(invoice.discount_cents)
        .bind(invoice.tax_cents)
        .bind(invoice.total_cents)
        .bind(invoice.payment_method)
        .bind(invoice.status)
        .bind(invoice.issued_at)
        .bind(invoice.paid_at)
        .bind(invoice.voided_at)
        .bind(&invoice.void_reason)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (id, invoice_id, product_id, name_snapshot,
                                           unit_price_cents, quantity, line_total_cents)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&item.id)
            .bind(&item.invoice_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.line_total_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(invoice_id = %invoice.id, number = %invoice.number, "invoice created");
        Ok(invoice)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invoice)
    }

    /// The invoice issued for an order, if any.
    pub async fn get_by_order(&self, order_id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE order_id = ?1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invoice)
    }

    pub async fn get_items(&self, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT id, invoice_id, product_id, name_snapshot, unit_price_cents, quantity,
                   line_total_cents
            FROM invoice_items
            WHERE invoice_id = ?1
            ORDER BY id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Lists invoices, optionally filtered by status, newest first.
    pub async fn list(&self, status: Option<InvoiceStatus>, limit: i64) -> DbResult<Vec<Invoice>> {
        let invoices = match status {
            Some(status) => {
                sqlx::query_as::<_, Invoice>(&format!(
                    "SELECT {INVOICE_COLUMNS} FROM invoices WHERE status = ?1 \
                     ORDER BY issued_at DESC LIMIT ?2"
                ))
                .bind(status)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Invoice>(&format!(
                    "SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY issued_at DESC LIMIT ?1"
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(invoices)
    }

    /// issued -> paid.
    pub async fn mark_paid(&self, id: &str) -> DbResult<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE invoices SET status = 'paid', paid_at = ?2 WHERE id = ?1 AND status = 'issued'",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// issued or paid -> voided, with the operator's reason.
    pub async fn void(&self, id: &str, reason: &str) -> DbResult<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE invoices SET status = 'voided', voided_at = ?2, void_reason = ?3 \
             WHERE id = ?1 AND status IN ('issued', 'paid')",
        )
        .bind(id)
        .bind(now)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Counts and totals grouped by status, folded into one summary.
    pub async fn stats(&self) -> DbResult<InvoiceStats> {
        let rows: Vec<(InvoiceStatus, i64, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*), COALESCE(SUM(total_cents), 0) FROM invoices GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = InvoiceStats::default();
        for (status, count, total_cents) in rows {
            match status {
                InvoiceStatus::Issued => {
                    stats.issued_count = count;
                    stats.total_invoiced_cents += total_cents;
                }
                InvoiceStatus::Paid => {
                    stats.paid_count = count;
                    stats.total_invoiced_cents += total_cents;
                    stats.total_paid_cents += total_cents;
                }
                InvoiceStatus::Voided => {
                    stats.voided_count = count;
                }
            }
        }
        Ok(stats)
    }
}
