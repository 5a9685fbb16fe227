//! Loyalty balances and point redemption.
//!
//! Points accrue when orders complete (see the order service); they leave
//! the ledger here, by being swapped for a single-use discount coupon.
//! The debit and the coupon mint commit together, so points can never be
//! spent without the coupon existing, or vice versa.

use chrono::Utc;
use tracing::info;

use mercato_core::{
    loyalty::{redemption_code, redemption_value_cents, validate_redemption},
    Coupon, CoreError, LoyaltyAccount, Money,
};

use crate::audit::{AuditAction, AuditEvent};
use crate::commerce::EngineContext;
use crate::error::EngineResult;
use crate::notify::Notification;
use crate::principal::Principal;

/// Result of a point redemption.
#[derive(Debug, Clone)]
pub struct Redemption {
    /// The minted single-use coupon.
    pub coupon: Coupon,
    pub points_redeemed: i64,
    pub points_remaining: i64,
}

/// Loyalty account reads and redemptions.
pub struct LoyaltyService {
    ctx: EngineContext,
}

impl LoyaltyService {
    pub(crate) fn new(ctx: EngineContext) -> Self {
        LoyaltyService { ctx }
    }

    /// Current account state. Unknown users read as an empty account.
    ///
    /// Customers may only read their own balance.
    pub async fn balance(&self, principal: &Principal, user_id: &str) -> EngineResult<LoyaltyAccount> {
        principal.require_access(Some(user_id))?;
        Ok(self.ctx.db.loyalty().get_or_default(user_id).await?)
    }

    /// Swaps points for a single-use fixed-amount coupon.
    ///
    /// `points: None` redeems the full balance. The request must clear
    /// the configured minimum and cannot exceed the balance; the balance
    /// check repeats inside the debit transaction, so concurrent
    /// redemptions cannot overspend.
    pub async fn redeem(
        &self,
        principal: &Principal,
        user_id: &str,
        points: Option<i64>,
    ) -> EngineResult<Redemption> {
        principal.require_access(Some(user_id))?;

        let loyalty = &self.ctx.config.loyalty;
        let account = self.ctx.db.loyalty().get_or_default(user_id).await?;
        let requested = points.unwrap_or(account.points);

        validate_redemption(requested, account.points, loyalty.min_redeem_points)?;

        let value_cents = redemption_value_cents(requested, loyalty.point_value_cents);
        if value_cents <= 0 {
            return Err(CoreError::ZeroValueCoupon.into());
        }

        let now = Utc::now();
        let coupon = Coupon::single_use_fixed(
            redemption_code(),
            value_cents,
            now,
            loyalty.coupon_validity_days,
        );

        self.ctx.db.loyalty().redeem(user_id, requested, &coupon).await?;

        let points_remaining = self.ctx.db.loyalty().get_or_default(user_id).await?.points;

        info!(
            user_id = %user_id,
            points = requested,
            code = %coupon.code,
            value_cents,
            "points redeemed"
        );
        self.ctx.audit.record(AuditEvent::new(
            &principal.id,
            AuditAction::PointsRedeemed,
            user_id,
            format!("{} points -> {}", requested, coupon.code),
        ));
        self.ctx.notifier.notify(Notification::for_user(
            user_id,
            "Points redeemed",
            format!(
                "Coupon {} is worth {} and expires in {} days.",
                coupon.code,
                Money::from_cents(value_cents),
                loyalty.coupon_validity_days
            ),
        ));

        Ok(Redemption {
            coupon,
            points_redeemed: requested,
            points_remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_commerce;
    use mercato_core::loyalty::REDEMPTION_CODE_PREFIX;

    #[tokio::test]
    async fn test_balance_requires_ownership() {
        let commerce = test_commerce().await;
        let err = commerce
            .loyalty()
            .balance(&Principal::customer("user-2"), "user-1")
            .await
            .unwrap_err();
        assert!(err.is_forbidden());

        // Admins read anyone; unknown accounts read as empty.
        let account = commerce
            .loyalty()
            .balance(&Principal::admin("staff-1"), "user-1")
            .await
            .unwrap();
        assert_eq!(account.points, 0);
    }

    #[tokio::test]
    async fn test_partial_redemption_mints_coupon() {
        let commerce = test_commerce().await;
        commerce.db().loyalty().credit("user-1", 200).await.unwrap();

        let redemption = commerce
            .loyalty()
            .redeem(&Principal::customer("user-1"), "user-1", Some(150))
            .await
            .unwrap();

        assert_eq!(redemption.points_redeemed, 150);
        assert_eq!(redemption.points_remaining, 50);
        assert_eq!(redemption.coupon.value, 150);
        assert!(redemption.coupon.code.starts_with(REDEMPTION_CODE_PREFIX));

        // The minted coupon discounts a checkout by its face value.
        let validated = commerce
            .coupons()
            .validate(&redemption.coupon.code, Money::from_cents(2_000), Some("user-1"))
            .await
            .unwrap();
        assert_eq!(validated.discount.cents(), 150);
    }

    #[tokio::test]
    async fn test_full_balance_redemption() {
        let commerce = test_commerce().await;
        commerce.db().loyalty().credit("user-1", 200).await.unwrap();

        let redemption = commerce
            .loyalty()
            .redeem(&Principal::customer("user-1"), "user-1", None)
            .await
            .unwrap();

        assert_eq!(redemption.points_redeemed, 200);
        assert_eq!(redemption.points_remaining, 0);
    }

    #[tokio::test]
    async fn test_minimum_enforced() {
        let commerce = test_commerce().await;
        commerce.db().loyalty().credit("user-1", 200).await.unwrap();

        let err = commerce
            .loyalty()
            .redeem(&Principal::customer("user-1"), "user-1", Some(50))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("100"));
    }

    #[tokio::test]
    async fn test_overdraw_rejected() {
        let commerce = test_commerce().await;
        commerce.db().loyalty().credit("user-1", 200).await.unwrap();

        let err = commerce
            .loyalty()
            .redeem(&Principal::customer("user-1"), "user-1", Some(300))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        // Balance untouched.
        let account = commerce
            .loyalty()
            .balance(&Principal::customer("user-1"), "user-1")
            .await
            .unwrap();
        assert_eq!(account.points, 200);
    }

    #[tokio::test]
    async fn test_empty_account_cannot_redeem() {
        let commerce = test_commerce().await;

        let err = commerce
            .loyalty()
            .redeem(&Principal::customer("user-1"), "user-1", None)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_minted_coupon_is_single_use() {
        let commerce = test_commerce().await;
        commerce.db().loyalty().credit("user-1", 150).await.unwrap();

        let redemption = commerce
            .loyalty()
            .redeem(&Principal::customer("user-1"), "user-1", None)
            .await
            .unwrap();

        commerce
            .db()
            .coupons()
            .register_use(&redemption.coupon.id, Some("user-1"))
            .await
            .unwrap();

        let err = commerce
            .coupons()
            .validate(&redemption.coupon.code, Money::from_cents(2_000), Some("user-1"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }
}
