//! Error types for business logic operations.
//!
//! Three error families live here:
//!
//! - [`CoreError`]: rule violations raised by order, loyalty and invoice
//!   operations (insufficient stock, bad state transitions, ...)
//! - [`CouponError`]: every way a coupon can fail validation, in the order
//!   the checks run
//! - [`ValidationError`]: malformed input caught before any rule runs
//!
//! All errors use `thiserror` for ergonomic error definitions and carry
//! enough context to produce a useful message without a second lookup.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

// ============================================================================
// Core Business Errors
// ============================================================================

/// Errors from business rule enforcement.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoreError {
    /// Product doesn't exist or is no longer sold.
    ///
    /// ## When This Occurs
    /// - Order line references an unknown product id
    /// - Product was deactivated between browsing and checkout
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Not enough stock to cover a requested quantity.
    ///
    /// ## When This Occurs
    /// - Order line asks for more units than are on hand
    /// - A concurrent order reserved the remaining units first
    ///
    /// The available count is captured at check time so callers can
    /// surface it to the buyer.
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Order doesn't exist in the system.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Customer doesn't exist in the system.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Invoice doesn't exist in the system.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Status string doesn't name a known order status.
    #[error("Invalid order status: {0}")]
    InvalidStatus(String),

    /// Order is in a state that doesn't permit the requested operation.
    ///
    /// ## When This Occurs
    /// - Status change not on the pending -> processing -> completed path
    /// - Attaching or reviewing payment proof on a non-pending order
    #[error("Order {order_id} is {current_status}, cannot perform operation")]
    InvalidOrderState {
        order_id: String,
        current_status: String,
    },

    /// Cancellation refused because the order was already fulfilled.
    #[error("Order {0} is already completed")]
    AlreadyCompleted(String),

    /// Cancellation refused because the order was already cancelled.
    #[error("Order {0} is already cancelled")]
    AlreadyCancelled(String),

    /// Payment confirmation requires an attached transfer proof.
    #[error("Order {0} has no payment proof attached")]
    NoProofAttached(String),

    /// Explicit invoice generation requires a completed order.
    #[error("Order {0} is not completed, cannot generate invoice")]
    OrderNotCompleted(String),

    /// Each order carries at most one invoice.
    #[error("An invoice already exists for order {0}")]
    InvoiceAlreadyExists(String),

    /// Invoice is in a state that doesn't permit the requested operation.
    ///
    /// ## When This Occurs
    /// - Marking a paid or voided invoice as paid
    /// - Voiding an already voided invoice
    #[error("Invoice {invoice_id} is {current_status}, cannot perform operation")]
    InvalidInvoiceStatus {
        invoice_id: String,
        current_status: String,
    },

    /// Redemption request is below the minimum point spend.
    #[error("Redemption requires at least {min} points")]
    BelowMinimumRedeem { min: i64 },

    /// Redemption request exceeds the spendable balance.
    #[error("Insufficient points: available {available}, requested {requested}")]
    InsufficientPoints { available: i64, requested: i64 },

    /// Redemption value rounds down to nothing.
    #[error("Redemption value is zero, nothing to convert")]
    ZeroValueCoupon,

    /// Coupon validation failure, passed through unchanged.
    #[error(transparent)]
    Coupon(#[from] CouponError),

    /// Input validation failure.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// ============================================================================
// Coupon Errors
// ============================================================================

/// Every way a coupon can fail validation.
///
/// Variants are listed in the order the checks run; validation stops at
/// the first failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CouponError {
    /// Code was empty after trimming.
    #[error("Coupon code is required")]
    InvalidCode,

    /// No active coupon carries this code.
    ///
    /// Inactive coupons are reported as not found rather than revealing
    /// that the code exists.
    #[error("Coupon not found: {0}")]
    NotFound(String),

    /// Validity window hasn't opened yet.
    #[error("Coupon {code} is not active yet")]
    NotYetActive { code: String },

    /// Validity window has closed.
    #[error("Coupon {code} has expired")]
    Expired { code: String },

    /// Global usage cap reached.
    #[error("Coupon {code} has reached its usage limit")]
    Exhausted { code: String },

    /// Order subtotal is below the coupon's minimum purchase.
    #[error("A minimum purchase of {min} is required for this coupon")]
    BelowMinimum { min: Money },

    /// This user already spent their per-user allowance.
    #[error("Coupon usage limit reached for this user")]
    UserLimitReached,
}

// ============================================================================
// Validation Errors
// ============================================================================

/// Input validation failures.
///
/// Used for structural problems with the input itself, before any
/// business rule is consulted.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    /// Required field was empty or missing.
    #[error("{field} is required")]
    Required { field: String },

    /// Field exceeds maximum length.
    #[error("{field} exceeds maximum length of {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value outside the accepted range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value doesn't match the expected format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not permitted in this context.
    #[error("{value} is not allowed for {field}")]
    NotAllowed { field: String, value: String },

    /// Value collides with an existing record.
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

/// Result type alias for core business operations.
pub type CoreResult<T> = Result<T, CoreError>;
