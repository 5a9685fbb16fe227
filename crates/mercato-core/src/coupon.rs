//! Coupon domain: discount kinds, validity rules, code normalization.
//!
//! A coupon is either a percentage discount (optionally capped) or a fixed
//! amount. Validation runs a fixed sequence of checks and stops at the
//! first failure; the checks that need storage lookups (active-code lookup,
//! per-user usage count) receive their inputs from the caller so this
//! module stays free of I/O.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CouponError;
use crate::money::Money;

// ============================================================================
// Discount
// ============================================================================

/// Storage tag for the two discount kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum DiscountKind {
    Percentage,
    FixedAmount,
}

/// A discount with its kind-specific parameters.
///
/// Built from the flat coupon row via [`Coupon::discount`]; keeping the
/// cap inside the `Percentage` variant makes it impossible to apply a
/// percentage cap to a fixed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discount {
    /// Percent of the subtotal (1-100), optionally capped at a cent amount.
    Percentage { percent: i64, cap_cents: Option<i64> },
    /// Flat amount in cents.
    FixedAmount { cents: i64 },
}

impl Discount {
    /// Computes the discount for a subtotal.
    ///
    /// Percentage discounts round half up and honor the cap when it is
    /// set and nonzero. The result is always clamped to `[0, subtotal]`
    /// so a discount can never push a total negative.
    pub fn amount(&self, subtotal: Money) -> Money {
        let raw = match self {
            Discount::Percentage { percent, cap_cents } => {
                let pct = subtotal.percent_of(*percent);
                match cap_cents {
                    Some(cap) if *cap > 0 => pct.min(Money::from_cents(*cap)),
                    _ => pct,
                }
            }
            Discount::FixedAmount { cents } => Money::from_cents(*cents),
        };
        raw.max(Money::zero()).min(subtotal.max(Money::zero()))
    }
}

// ============================================================================
// Coupon
// ============================================================================

/// A discount code with validity window and usage caps.
///
/// `usage_limit` and `per_user_limit` use 0 to mean unlimited. `times_used`
/// is only ever advanced by the storage layer after an order durably
/// commits, so failed checkouts never consume uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Coupon {
    pub id: String,
    pub code: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub max_discount_cents: Option<i64>,
    pub min_purchase_cents: Option<i64>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_limit: i64,
    pub per_user_limit: i64,
    pub times_used: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Builds the tagged discount from the flat row fields.
    pub fn discount(&self) -> Discount {
        match self.kind {
            DiscountKind::Percentage => Discount::Percentage {
                percent: self.value,
                cap_cents: self.max_discount_cents,
            },
            DiscountKind::FixedAmount => Discount::FixedAmount { cents: self.value },
        }
    }

    /// Runs the validity checks in order and returns the discount amount.
    ///
    /// Check order: validity window, global usage cap, minimum purchase,
    /// per-user cap. The caller supplies `user_uses` (this user's prior
    /// redemptions) when the coupon has a per-user limit and the request
    /// is attributable to a user; `None` skips the per-user check.
    ///
    /// Read-only: counters advance elsewhere, after the order commits.
    pub fn check(
        &self,
        now: DateTime<Utc>,
        subtotal: Money,
        user_uses: Option<i64>,
    ) -> Result<Money, CouponError> {
        if let Some(starts_at) = self.starts_at {
            if now < starts_at {
                return Err(CouponError::NotYetActive {
                    code: self.code.clone(),
                });
            }
        }

        if let Some(ends_at) = self.ends_at {
            if now > ends_at {
                return Err(CouponError::Expired {
                    code: self.code.clone(),
                });
            }
        }

        if self.usage_limit > 0 && self.times_used >= self.usage_limit {
            return Err(CouponError::Exhausted {
                code: self.code.clone(),
            });
        }

        if let Some(min) = self.min_purchase_cents {
            if min > 0 && subtotal.cents() < min {
                return Err(CouponError::BelowMinimum {
                    min: Money::from_cents(min),
                });
            }
        }

        if self.per_user_limit > 0 {
            if let Some(uses) = user_uses {
                if uses >= self.per_user_limit {
                    return Err(CouponError::UserLimitReached);
                }
            }
        }

        Ok(self.discount().amount(subtotal))
    }

    /// Mints a single-use fixed-amount coupon, as issued by point
    /// redemption.
    ///
    /// One global use, one per-user use, active immediately, valid for
    /// `validity_days` days.
    pub fn single_use_fixed(
        code: String,
        value_cents: i64,
        now: DateTime<Utc>,
        validity_days: i64,
    ) -> Coupon {
        Coupon {
            id: Uuid::new_v4().to_string(),
            code,
            kind: DiscountKind::FixedAmount,
            value: value_cents,
            max_discount_cents: None,
            min_purchase_cents: None,
            starts_at: Some(now),
            ends_at: Some(now + Duration::days(validity_days)),
            usage_limit: 1,
            per_user_limit: 1,
            times_used: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// Code Normalization
// ============================================================================

/// Normalizes a raw code: trim, uppercase, reject empty.
///
/// ## Example
///
/// ```
/// use mercato_core::coupon::normalize_code;
///
/// assert_eq!(normalize_code("  save10 ").unwrap(), "SAVE10");
/// assert!(normalize_code("   ").is_err());
/// ```
pub fn normalize_code(raw: &str) -> Result<String, CouponError> {
    let code = raw.trim().to_uppercase();
    if code.is_empty() {
        return Err(CouponError::InvalidCode);
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base_coupon() -> Coupon {
        let now = Utc::now();
        Coupon {
            id: "cp1".to_string(),
            code: "SAVE10".to_string(),
            kind: DiscountKind::Percentage,
            value: 10,
            max_discount_cents: Some(500),
            min_purchase_cents: Some(2000),
            starts_at: None,
            ends_at: None,
            usage_limit: 0,
            per_user_limit: 0,
            times_used: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_percentage_with_cap() {
        // 10% of $100.00 is $10.00, capped at $5.00.
        let coupon = base_coupon();
        let discount = coupon
            .check(Utc::now(), Money::from_cents(10_000), None)
            .unwrap();
        assert_eq!(discount, Money::from_cents(500));
    }

    #[test]
    fn test_percentage_under_cap() {
        // 10% of $30.00 is $3.00, below the $5.00 cap.
        let coupon = base_coupon();
        let discount = coupon
            .check(Utc::now(), Money::from_cents(3000), None)
            .unwrap();
        assert_eq!(discount, Money::from_cents(300));
    }

    #[test]
    fn test_zero_cap_means_uncapped() {
        let mut coupon = base_coupon();
        coupon.max_discount_cents = Some(0);
        let discount = coupon
            .check(Utc::now(), Money::from_cents(10_000), None)
            .unwrap();
        assert_eq!(discount, Money::from_cents(1000));
    }

    #[test]
    fn test_fixed_amount_clamped_to_subtotal() {
        let discount = Discount::FixedAmount { cents: 5000 };
        assert_eq!(
            discount.amount(Money::from_cents(3000)),
            Money::from_cents(3000)
        );
        assert_eq!(
            discount.amount(Money::from_cents(8000)),
            Money::from_cents(5000)
        );
    }

    #[test]
    fn test_below_minimum_purchase() {
        let coupon = base_coupon();
        let err = coupon
            .check(Utc::now(), Money::from_cents(1500), None)
            .unwrap_err();
        assert_eq!(
            err,
            CouponError::BelowMinimum {
                min: Money::from_cents(2000)
            }
        );
    }

    #[test]
    fn test_window_not_open_yet() {
        let now = Utc::now();
        let mut coupon = base_coupon();
        coupon.starts_at = Some(now + Duration::days(1));
        let err = coupon.check(now, Money::from_cents(10_000), None).unwrap_err();
        assert!(matches!(err, CouponError::NotYetActive { .. }));
    }

    #[test]
    fn test_window_expired() {
        let now = Utc::now();
        let mut coupon = base_coupon();
        coupon.ends_at = Some(now - Duration::hours(1));
        let err = coupon.check(now, Money::from_cents(10_000), None).unwrap_err();
        assert_eq!(
            err,
            CouponError::Expired {
                code: "SAVE10".to_string()
            }
        );
    }

    #[test]
    fn test_global_cap_exhausted() {
        let mut coupon = base_coupon();
        coupon.usage_limit = 3;
        coupon.times_used = 3;
        let err = coupon
            .check(Utc::now(), Money::from_cents(10_000), None)
            .unwrap_err();
        assert!(matches!(err, CouponError::Exhausted { .. }));
    }

    #[test]
    fn test_per_user_cap() {
        let mut coupon = base_coupon();
        coupon.per_user_limit = 1;

        // First use passes, second is refused.
        assert!(coupon.check(Utc::now(), Money::from_cents(10_000), Some(0)).is_ok());
        let err = coupon
            .check(Utc::now(), Money::from_cents(10_000), Some(1))
            .unwrap_err();
        assert_eq!(err, CouponError::UserLimitReached);

        // No attributable user skips the per-user check.
        assert!(coupon.check(Utc::now(), Money::from_cents(10_000), None).is_ok());
    }

    #[test]
    fn test_check_order_window_before_minimum() {
        // An expired coupon on a too-small order reports expiry, not the
        // minimum, because the window check runs first.
        let now = Utc::now();
        let mut coupon = base_coupon();
        coupon.ends_at = Some(now - Duration::days(1));
        let err = coupon.check(now, Money::from_cents(100), None).unwrap_err();
        assert!(matches!(err, CouponError::Expired { .. }));
    }

    #[test]
    fn test_single_use_fixed_mint() {
        let now = Utc::now();
        let coupon = Coupon::single_use_fixed("PUNTOS-AB12CD34".to_string(), 150, now, 30);

        assert_eq!(coupon.kind, DiscountKind::FixedAmount);
        assert_eq!(coupon.value, 150);
        assert_eq!(coupon.usage_limit, 1);
        assert_eq!(coupon.per_user_limit, 1);
        assert_eq!(coupon.ends_at, Some(now + Duration::days(30)));
        assert!(coupon.is_active);
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" welcome5 ").unwrap(), "WELCOME5");
        assert_eq!(normalize_code("SAVE10").unwrap(), "SAVE10");
        assert_eq!(normalize_code("").unwrap_err(), CouponError::InvalidCode);
        assert_eq!(normalize_code("  \t").unwrap_err(), CouponError::InvalidCode);
    }
}
