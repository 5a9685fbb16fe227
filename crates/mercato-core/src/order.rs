//! Order domain: lifecycle states, line items and totals arithmetic.
//!
//! ## Lifecycle
//!
//! ```text
//!                ┌────────────┐
//!                │  pending   │
//!                └─────┬──────┘
//!          confirm     │      cancel
//!        ┌─────────────┴─────────────┐
//!        ▼                           ▼
//!  ┌────────────┐             ┌────────────┐
//!  │ processing │────────────▶│ cancelled  │
//!  └─────┬──────┘   cancel    └────────────┘
//!        │ deliver
//!        ▼
//!  ┌────────────┐
//!  │ completed  │
//!  └────────────┘
//! ```
//!
//! Completed and cancelled are terminal. Line items snapshot the product
//! name and unit price at order time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;
use crate::money::Money;
use crate::types::{FiscalData, PaymentMethod, Product};

// ============================================================================
// Status Enums
// ============================================================================

/// Where an order sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Whether the lifecycle permits moving from `self` to `next`.
    ///
    /// Setting the current status again is treated as a no-op by callers,
    /// not as a transition, so it is not listed here.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Pending, Cancelled) | (Processing, Completed) | (Processing, Cancelled)
        )
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// Settlement state of the order's payment.
///
/// Transfers start pending and are confirmed or rejected during proof
/// review; cash and card orders are settled on the spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Rejected,
}

// ============================================================================
// Order
// ============================================================================

/// An order with its money totals and lifecycle bookkeeping.
///
/// `points_earned` doubles as the loyalty accrual sentinel: it stays 0
/// until completion awards points exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub number: String,
    pub customer_id: String,
    pub user_id: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub coupon_code: Option<String>,
    pub points_earned: i64,
    pub transfer_reference: Option<String>,
    pub transfer_note: Option<String>,
    pub proof_submitted_at: Option<DateTime<Utc>>,
    pub proof_reviewed_by: Option<String>,
    pub proof_reviewed_at: Option<DateTime<Utc>>,
    pub invoice_id: Option<String>,
    pub fiscal_data_json: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Fiscal data captured at checkout, if the buyer supplied any.
    pub fn fiscal_data(&self) -> Option<FiscalData> {
        self.fiscal_data_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
    }

    /// Whether a transfer proof has been attached.
    pub fn has_transfer_proof(&self) -> bool {
        self.transfer_reference.is_some()
    }
}

// ============================================================================
// Order Items
// ============================================================================

/// A line item with name and price snapshotted at order time.
///
/// Catalog edits after the fact must not rewrite order history, so the
/// item never reads back through the product row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Snapshots a product into a line item.
    pub fn snapshot(
        order_id: &str,
        product: &Product,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            product_id: product.id.clone(),
            name_snapshot: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            line_total_cents: product.price().multiply_quantity(quantity).cents(),
            created_at: now,
        }
    }

    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// ============================================================================
// Totals
// ============================================================================

/// The four money figures stored on every order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

/// Computes order totals from the subtotal and both discount sources.
///
/// The combined discount is clamped to `[0, subtotal]` and the total
/// floors at zero. Catalog prices are tax-inclusive, so the order tax
/// line is always zero; invoices add tax separately at issue time.
pub fn compute_totals(subtotal: Money, manual_discount: Money, coupon_discount: Money) -> OrderTotals {
    let discount = (manual_discount + coupon_discount)
        .max(Money::zero())
        .min(subtotal.max(Money::zero()));
    let total = (subtotal - discount).max(Money::zero());

    OrderTotals {
        subtotal_cents: subtotal.cents(),
        discount_cents: discount.cents(),
        tax_cents: 0,
        total_cents: total.cents(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(price_cents: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            name: "Ceramic Mug".to_string(),
            category: None,
            price_cents,
            stock: 50,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_transition_matrix() {
        use OrderStatus::*;

        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Cancelled));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));

        assert!(Completed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("processing".parse::<OrderStatus>().unwrap(), OrderStatus::Processing);
        assert_eq!(" Completed ".parse::<OrderStatus>().unwrap(), OrderStatus::Completed);
        assert_eq!(OrderStatus::Cancelled.to_string(), "cancelled");

        let err = "shipped".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err, CoreError::InvalidStatus("shipped".to_string()));
    }

    #[test]
    fn test_item_snapshot() {
        let item = OrderItem::snapshot("ord-1", &product(1250), 4, Utc::now());
        assert_eq!(item.name_snapshot, "Ceramic Mug");
        assert_eq!(item.unit_price(), Money::from_cents(1250));
        assert_eq!(item.line_total(), Money::from_cents(5000));
        assert_eq!(item.quantity, 4);
    }

    #[test]
    fn test_totals_combine_discounts() {
        let totals = compute_totals(
            Money::from_cents(10_000),
            Money::from_cents(300),
            Money::from_cents(500),
        );
        assert_eq!(totals.subtotal_cents, 10_000);
        assert_eq!(totals.discount_cents, 800);
        assert_eq!(totals.tax_cents, 0);
        assert_eq!(totals.total_cents, 9200);
    }

    #[test]
    fn test_totals_discount_clamped_to_subtotal() {
        let totals = compute_totals(
            Money::from_cents(1000),
            Money::from_cents(800),
            Money::from_cents(800),
        );
        assert_eq!(totals.discount_cents, 1000);
        assert_eq!(totals.total_cents, 0);
    }

    #[test]
    fn test_totals_never_negative() {
        let totals = compute_totals(Money::zero(), Money::from_cents(500), Money::zero());
        assert_eq!(totals.discount_cents, 0);
        assert_eq!(totals.total_cents, 0);
    }

    #[test]
    fn test_order_tax_is_always_zero() {
        let totals = compute_totals(Money::from_cents(99_999), Money::zero(), Money::from_cents(1));
        assert_eq!(totals.tax_cents, 0);
    }
}
