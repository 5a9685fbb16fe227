//! Money type for precise currency calculations.
//!
//! ## Why Integer Cents?
//!
//! Floating point arithmetic is unsuitable for money:
//!
//! ```text
//! 0.1 + 0.2 = 0.30000000000000004  // f64 disasters
//! ```
//!
//! All amounts are stored as `i64` cents. Totals, discounts and taxes are
//! computed in integer space and only formatted as dollars at the edges.
//!
//! ## Range
//!
//! `i64` cents covers ±92 quadrillion dollars, far beyond any realistic
//! order or invoice total.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::TaxRate;

/// Represents a monetary amount in cents.
///
/// ## Example
///
/// ```
/// use mercato_core::Money;
///
/// let price = Money::from_cents(2599); // $25.99
/// let qty_total = price.multiply_quantity(3); // $77.97
/// assert_eq!(qty_total.cents(), 7797);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the raw cent value.
    #[inline]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns the whole dollar part (truncated toward zero).
    #[inline]
    pub const fn dollars(self) -> i64 {
        self.0 / 100
    }

    /// Returns the cent remainder as a non-negative value for display.
    #[inline]
    pub const fn cents_part(self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero amount.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Absolute value.
    #[inline]
    pub const fn abs(self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit price by a quantity to produce a line total.
    ///
    /// ## Example
    ///
    /// ```
    /// use mercato_core::Money;
    ///
    /// let unit = Money::from_cents(1250); // $12.50
    /// assert_eq!(unit.multiply_quantity(4).cents(), 5000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(self, quantity: i64) -> Self {
        Money(self.0 * quantity)
    }

    /// Calculates tax on this amount, rounding half up.
    ///
    /// Widens to `i128` so intermediate products cannot overflow.
    ///
    /// ## Example
    ///
    /// ```
    /// use mercato_core::{Money, TaxRate};
    ///
    /// let base = Money::from_cents(10_000); // $100.00
    /// let tax = base.calculate_tax(TaxRate::from_bps(1300)); // 13%
    /// assert_eq!(tax.cents(), 1300);
    /// ```
    pub fn calculate_tax(self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Computes a whole-number percentage of this amount, rounding half up.
    ///
    /// Used for percentage coupons where `percent` is 1-100.
    pub fn percent_of(self, percent: i64) -> Money {
        let cents = (self.0 as i128 * percent as i128 + 50) / 100;
        Money::from_cents(cents as i64)
    }
}

impl fmt::Display for Money {
    /// Formats as dollars with a sign: `$12.34` or `-$5.00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

// ============================================================================
// Arithmetic Operators
// ============================================================================

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, quantity: i64) -> Money {
        Money(self.0 * quantity)
    }
}
