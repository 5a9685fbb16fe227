//! Shared domain types.
//!
//! Primitives used across the order, coupon, loyalty and invoice modules:
//! tax rates, payment methods, the product catalog entry, the customer
//! record and the fiscal data block that invoicing snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

// ============================================================================
// Tax Rate
// ============================================================================

/// Tax rate in basis points (1/100th of a percent).
///
/// Using basis points avoids floating point: 13% = 1300 bps, 8.25% = 825 bps.
///
/// ## Example
///
/// ```
/// use mercato_core::TaxRate;
///
/// let rate = TaxRate::from_percentage(13.0);
/// assert_eq!(rate.bps(), 1300);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (e.g. 13.0 for 13%).
    #[inline]
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage.
    #[inline]
    pub fn percentage(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero rate, used for tax-inclusive pricing.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

// ============================================================================
// Payment Method
// ============================================================================

/// How an order is paid.
///
/// Bank transfers start unconfirmed and go through proof-of-payment review;
/// cash and card are settled at the point of sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Product
// ============================================================================

/// A catalog entry.
///
/// Prices are tax-inclusive integer cents. Stock is decremented when an
/// order reserves units and restored when an order is cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub price_cents: i64,
    pub stock: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as Money.
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether the product can cover the requested quantity right now.
    ///
    /// This is the pre-check; the storage layer enforces the same rule
    /// atomically at reservation time.
    pub fn has_stock(&self, quantity: i64) -> bool {
        self.is_active && self.stock >= quantity
    }
}

// ============================================================================
// Fiscal Data
// ============================================================================

/// Billing details attached to an invoice.
///
/// Every field is optional; [`FiscalData::overlay`] merges layered sources
/// (explicit request, stored billing profile, bare customer record) by
/// taking the first non-empty value per field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiscalData {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Trims and drops empty strings so `Some("")` never wins a merge.
fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl FiscalData {
    /// Merges two layers, preferring `self` per field.
    ///
    /// ## Example
    ///
    /// ```
    /// use mercato_core::FiscalData;
    ///
    /// let explicit = FiscalData { tax_id: Some("XAXX010101000".into()), ..Default::default() };
    /// let profile = FiscalData { name: Some("ACME SA".into()), tax_id: Some("old".into()), ..Default::default() };
    /// let merged = explicit.overlay(&profile);
    /// assert_eq!(merged.tax_id.as_deref(), Some("XAXX010101000"));
    /// assert_eq!(merged.name.as_deref(), Some("ACME SA"));
    /// ```
    pub fn overlay(&self, under: &FiscalData) -> FiscalData {
        FiscalData {
            name: non_empty(&self.name).or_else(|| non_empty(&under.name)),
            tax_id: non_empty(&self.tax_id).or_else(|| non_empty(&under.tax_id)),
            address: non_empty(&self.address).or_else(|| non_empty(&under.address)),
            email: non_empty(&self.email).or_else(|| non_empty(&under.email)),
            phone: non_empty(&self.phone).or_else(|| non_empty(&under.phone)),
        }
    }

    /// Complete enough to issue an invoice without operator follow-up:
    /// legal name and tax id are both present.
    pub fn is_complete(&self) -> bool {
        non_empty(&self.name).is_some() && non_empty(&self.tax_id).is_some()
    }

    /// True when no field carries a usable value.
    pub fn is_empty(&self) -> bool {
        non_empty(&self.name).is_none()
            && non_empty(&self.tax_id).is_none()
            && non_empty(&self.address).is_none()
            && non_empty(&self.email).is_none()
            && non_empty(&self.phone).is_none()
    }
}

// ============================================================================
// Customer
// ============================================================================

/// A customer record.
///
/// `user_id` links to an authenticated account when the customer shops
/// online; walk-in customers have none. The `billing_*` columns hold the
/// stored billing profile used as an invoicing fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub billing_name: Option<String>,
    pub billing_tax_id: Option<String>,
    pub billing_address: Option<String>,
    pub billing_email: Option<String>,
    pub billing_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// The stored billing profile as a fiscal data layer.
    pub fn billing_profile(&self) -> FiscalData {
        FiscalData {
            name: self.billing_name.clone(),
            tax_id: self.billing_tax_id.clone(),
            address: self.billing_address.clone(),
            email: self.billing_email.clone(),
            phone: self.billing_phone.clone(),
        }
    }

    /// The bare customer fields as the last-resort fiscal layer.
    pub fn bare_profile(&self) -> FiscalData {
        FiscalData {
            name: Some(self.name.clone()),
            tax_id: None,
            address: None,
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}
