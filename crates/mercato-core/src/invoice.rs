//! Invoice domain: fiscal documents issued against completed orders.
//!
//! Unlike orders, where catalog prices already include tax, invoices add
//! tax explicitly on top of the discounted base. Both figures live on the
//! same document without ever flowing back into order totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::money::Money;
use crate::order::OrderItem;
use crate::types::{FiscalData, PaymentMethod, TaxRate};

// ============================================================================
// Status
// ============================================================================

/// Invoice lifecycle: issued, then optionally paid, then possibly voided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum InvoiceStatus {
    Issued,
    Paid,
    Voided,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Voided => "voided",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Invoice
// ============================================================================

/// A fiscal document tied to exactly one order.
///
/// The `fiscal_*` fields are a point-in-time snapshot of the merged
/// billing data; later edits to the customer's profile do not touch
/// issued invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: String,
    pub number: String,
    pub order_id: String,
    pub customer_id: String,
    pub fiscal_name: String,
    pub fiscal_tax_id: Option<String>,
    pub fiscal_address: Option<String>,
    pub fiscal_email: Option<String>,
    pub fiscal_phone: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: InvoiceStatus,
    pub issued_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub voided_at: Option<DateTime<Utc>>,
    pub void_reason: Option<String>,
}

impl Invoice {
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// The snapshotted billing block, for rendering.
    pub fn fiscal_data(&self) -> FiscalData {
        FiscalData {
            name: Some(self.fiscal_name.clone()),
            tax_id: self.fiscal_tax_id.clone(),
            address: self.fiscal_address.clone(),
            email: self.fiscal_email.clone(),
            phone: self.fiscal_phone.clone(),
        }
    }

    /// Recomputes tax and total from the stored subtotal and discount.
    ///
    /// Pure function of those two fields plus the rate, so repeated calls
    /// converge on the same figures.
    pub fn recalculate(&mut self, rate: TaxRate) {
        let totals = invoice_totals(self.subtotal(), Money::from_cents(self.discount_cents), rate);
        self.tax_cents = totals.tax_cents;
        self.total_cents = totals.total_cents;
    }
}

// ============================================================================
// Invoice Items
// ============================================================================

/// An invoice line, copied from the order's snapshot at issue time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub product_id: Option<String>,
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

impl InvoiceItem {
    /// Copies an order line onto an invoice.
    pub fn from_order_item(invoice_id: &str, item: &OrderItem) -> InvoiceItem {
        InvoiceItem {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.to_string(),
            product_id: Some(item.product_id.clone()),
            name_snapshot: item.name_snapshot.clone(),
            unit_price_cents: item.unit_price_cents,
            quantity: item.quantity,
            line_total_cents: item.line_total_cents,
        }
    }

    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// ============================================================================
// Totals
// ============================================================================

/// Tax and grand total for an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub tax_cents: i64,
    pub total_cents: i64,
}

/// Computes invoice figures: tax applies to the discounted base.
///
/// ```text
/// base  = subtotal - discount
/// tax   = base * rate          (rounded half up)
/// total = base + tax
/// ```
pub fn invoice_totals(subtotal: Money, discount: Money, rate: TaxRate) -> InvoiceTotals {
    let base = subtotal - discount;
    let tax = base.calculate_tax(rate);
    InvoiceTotals {
        tax_cents: tax.cents(),
        total_cents: (base + tax).cents(),
    }
}
