//! # Mercato Core
//!
//! Pure business logic for the Mercato order and billing backend.
//! This crate contains NO I/O operations: no database, no network, no
//! async. Everything here is deterministic and unit-testable.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   mercato-core                      │
//! │                                                     │
//! │  ┌─────────┐  ┌─────────┐  ┌──────────────────┐    │
//! │  │  money  │  │  types  │  │    validation    │    │
//! │  └────┬────┘  └────┬────┘  └────────┬─────────┘    │
//! │       │            │                │               │
//! │  ┌────┴────────────┴────────────────┴─────────┐    │
//! │  │   coupon / order / invoice / loyalty       │    │
//! │  │   numbering                                │    │
//! │  └────────────────────────────────────────────┘    │
//! │                                                     │
//! │  Consumed by: mercato-db, mercato-engine            │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`]: Integer-cent currency arithmetic
//! - [`types`]: Tax rates, payment methods, products, customers
//! - [`coupon`]: Discount kinds and coupon validity rules
//! - [`order`]: Order lifecycle and totals
//! - [`invoice`]: Invoice figures and fiscal snapshots
//! - [`loyalty`]: Point accrual and redemption arithmetic
//! - [`numbering`]: Order and invoice document numbers
//! - [`validation`]: Input validation helpers
//! - [`error`]: Typed errors for all of the above
//!
//! ## Design Principles
//!
//! 1. All money is integer cents; floats never touch an amount
//! 2. Functions that depend on "now" take it as a parameter
//! 3. Storage-dependent checks receive their inputs from the caller
//!
//! ## Example
//!
//! ```
//! use mercato_core::coupon::Discount;
//! use mercato_core::{compute_totals, Money};
//!
//! let subtotal = Money::from_cents(10_000); // $100.00
//! let coupon = Discount::Percentage { percent: 10, cap_cents: Some(500) };
//! let totals = compute_totals(subtotal, Money::zero(), coupon.amount(subtotal));
//!
//! assert_eq!(totals.discount_cents, 500); // capped at $5.00
//! assert_eq!(totals.total_cents, 9_500);
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod coupon;
pub mod error;
pub mod invoice;
pub mod loyalty;
pub mod money;
pub mod numbering;
pub mod order;
pub mod types;
pub mod validation;

// ============================================================================
// Re-exports for Convenience
// ============================================================================

pub use coupon::{Coupon, Discount, DiscountKind};
pub use error::{CoreError, CoreResult, CouponError, ValidationError};
pub use invoice::{invoice_totals, Invoice, InvoiceItem, InvoiceStatus, InvoiceTotals};
pub use loyalty::LoyaltyAccount;
pub use money::Money;
pub use order::{compute_totals, Order, OrderItem, OrderStatus, OrderTotals, PaymentStatus};
pub use types::*;

// ============================================================================
// Crate-Level Constants
// ============================================================================

/// Maximum number of line items in a single order.
///
/// ## Why
/// Bounds transaction size: every line reserves stock inside the creation
/// transaction, and an unbounded order would hold the writer for too long.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity for a single line item.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum length for product and snapshot names.
pub const MAX_NAME_LENGTH: usize = 200;

/// Price ceiling in cents ($1,000,000.00). Catches fat-fingered input
/// before it lands in the catalog.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// Default invoice tax rate: 13% in basis points.
///
/// ## Business Reason
/// Catalog prices are tax-inclusive, so orders carry no tax line; the
/// fiscal document adds this rate on the discounted base.
pub const DEFAULT_INVOICE_TAX_BPS: u32 = 1300;

/// Default minimum point spend per redemption.
pub const DEFAULT_MIN_REDEEM_POINTS: i64 = 100;

/// Default value of one point, in cents (100 points = $1.00).
pub const DEFAULT_POINT_VALUE_CENTS: i64 = 1;

/// Default validity of redemption-minted coupons, in days.
pub const DEFAULT_REDEMPTION_VALIDITY_DAYS: i64 = 30;
