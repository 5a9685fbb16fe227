//! Loyalty points: accrual and redemption arithmetic.
//!
//! Buyers earn one point per whole currency unit of a completed order's
//! final total. Points convert back into single-use discount coupons at
//! redemption time; the conversion rate and minimum spend are
//! configuration inputs so they stay adjustable without touching logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Prefix carried by every redemption-minted coupon code.
pub const REDEMPTION_CODE_PREFIX: &str = "PUNTOS-";

// ============================================================================
// Account
// ============================================================================

/// A user's point balance.
///
/// `points` is spendable; `lifetime_points` only ever grows and feeds
/// reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LoyaltyAccount {
    pub user_id: String,
    pub points: i64,
    pub lifetime_points: i64,
    pub updated_at: DateTime<Utc>,
}

impl LoyaltyAccount {
    /// An empty account for users who have never earned points.
    pub fn empty(user_id: &str, now: DateTime<Utc>) -> LoyaltyAccount {
        LoyaltyAccount {
            user_id: user_id.to_string(),
            points: 0,
            lifetime_points: 0,
            updated_at: now,
        }
    }
}

// ============================================================================
// Accrual
// ============================================================================

/// Points earned by an order total: one point per whole unit, truncated.
///
/// ## Example
///
/// ```
/// use mercato_core::loyalty::points_for_total;
///
/// assert_eq!(points_for_total(15_099), 150); // $150.99 -> 150 points
/// assert_eq!(points_for_total(99), 0);       // under $1 earns nothing
/// ```
pub fn points_for_total(total_cents: i64) -> i64 {
    if total_cents <= 0 {
        return 0;
    }
    total_cents / 100
}

// ============================================================================
// Redemption
// ============================================================================

/// Cent value of a point spend.
pub fn redemption_value_cents(points: i64, point_value_cents: i64) -> i64 {
    points * point_value_cents
}

/// Checks a redemption request against the balance and minimum spend.
///
/// The minimum check runs before the balance check, so asking for too few
/// points reports the minimum even when the balance could not cover them.
pub fn validate_redemption(requested: i64, balance: i64, min_points: i64) -> CoreResult<()> {
    if requested < min_points {
        return Err(CoreError::BelowMinimumRedeem { min: min_points });
    }
    if requested > balance {
        return Err(CoreError::InsufficientPoints {
            available: balance,
            requested,
        });
    }
    Ok(())
}

/// Generates a fresh redemption coupon code: `PUNTOS-` plus 8 hex chars.
pub fn redemption_code() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}{}", REDEMPTION_CODE_PREFIX, id[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accrual_truncates_to_whole_units() {
        assert_eq!(points_for_total(10_000), 100);
        assert_eq!(points_for_total(15_099), 150);
        assert_eq!(points_for_total(100), 1);
        assert_eq!(points_for_total(99), 0);
        assert_eq!(points_for_total(0), 0);
        assert_eq!(points_for_total(-500), 0);
    }

    #[test]
    fn test_redemption_value() {
        // 150 points at 1 cent each: $1.50.
        assert_eq!(redemption_value_cents(150, 1), 150);
        assert_eq!(redemption_value_cents(100, 2), 200);
        assert_eq!(redemption_value_cents(100, 0), 0);
    }

    #[test]
    fn test_redemption_minimum_checked_first() {
        // Below the minimum reports the minimum even with a thin balance.
        let err = validate_redemption(50, 10, 100).unwrap_err();
        assert_eq!(err, CoreError::BelowMinimumRedeem { min: 100 });
    }

    #[test]
    fn test_redemption_balance_check() {
        let err = validate_redemption(150, 120, 100).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientPoints {
                available: 120,
                requested: 150
            }
        );

        assert!(validate_redemption(120, 120, 100).is_ok());
    }

    #[test]
    fn test_redemption_code_format() {
        let code = redemption_code();
        assert!(code.starts_with("PUNTOS-"));
        assert_eq!(code.len(), "PUNTOS-".len() + 8);
        assert!(code[7..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(code, code.to_uppercase());
    }

    #[test]
    fn test_empty_account() {
        let account = LoyaltyAccount::empty("u1", Utc::now());
        assert_eq!(account.points, 0);
        assert_eq!(account.lifetime_points, 0);
    }
}
