//! Coupon administration and validation.
//!
//! Validation here is read-only: it tells the caller what the coupon
//! would be worth against a subtotal. Usage counters only advance after
//! a consuming order has committed, so an abandoned checkout never burns
//! a use.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use mercato_core::{
    coupon::normalize_code, validation::validate_coupon_value, Coupon, CouponError, DiscountKind,
    Money, ValidationError,
};
use mercato_db::DbError;

use crate::audit::{AuditAction, AuditEvent};
use crate::commerce::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::principal::Principal;

/// Input for a new coupon.
#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub code: String,
    pub kind: DiscountKind,
    /// Percent (1-100) or fixed cents, depending on `kind`.
    pub value: i64,
    /// Ceiling for percentage discounts, in cents. `None` or 0 = uncapped.
    pub max_discount_cents: Option<i64>,
    /// Minimum order subtotal required, in cents.
    pub min_purchase_cents: Option<i64>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    /// Total redemptions across all users. 0 = unlimited.
    pub usage_limit: i64,
    /// Redemptions per user. 0 = unlimited.
    pub per_user_limit: i64,
}

impl Default for NewCoupon {
    fn default() -> Self {
        NewCoupon {
            code: String::new(),
            kind: DiscountKind::Percentage,
            value: 0,
            max_discount_cents: None,
            min_purchase_cents: None,
            starts_at: None,
            ends_at: None,
            usage_limit: 0,
            per_user_limit: 0,
        }
    }
}

/// A coupon that passed validation, with its discount against the
/// subtotal it was checked for.
#[derive(Debug, Clone)]
pub struct ValidatedCoupon {
    pub coupon: Coupon,
    pub discount: Money,
}

/// Coupon management and checkout-time validation.
pub struct CouponService {
    ctx: EngineContext,
}

impl CouponService {
    pub(crate) fn new(ctx: EngineContext) -> Self {
        CouponService { ctx }
    }

    /// Creates a coupon. Admin only.
    pub async fn create(&self, principal: &Principal, input: NewCoupon) -> EngineResult<Coupon> {
        principal.require_admin()?;

        let code = normalize_code(&input.code)?;
        validate_coupon_value(input.kind, input.value)?;

        if input.max_discount_cents.unwrap_or(0) < 0 {
            return Err(ValidationError::MustBePositive {
                field: "max_discount_cents".to_string(),
            }
            .into());
        }
        if input.min_purchase_cents.unwrap_or(0) < 0 {
            return Err(ValidationError::MustBePositive {
                field: "min_purchase_cents".to_string(),
            }
            .into());
        }
        if input.usage_limit < 0 {
            return Err(ValidationError::MustBePositive {
                field: "usage_limit".to_string(),
            }
            .into());
        }
        if input.per_user_limit < 0 {
            return Err(ValidationError::MustBePositive {
                field: "per_user_limit".to_string(),
            }
            .into());
        }
        if let (Some(starts_at), Some(ends_at)) = (input.starts_at, input.ends_at) {
            if ends_at <= starts_at {
                return Err(ValidationError::InvalidFormat {
                    field: "ends_at".to_string(),
                    reason: "must be after starts_at".to_string(),
                }
                .into());
            }
        }

        let now = Utc::now();
        let coupon = Coupon {
            id: Uuid::new_v4().to_string(),
            code: code.clone(),
            kind: input.kind,
            value: input.value,
            max_discount_cents: input.max_discount_cents,
            min_purchase_cents: input.min_purchase_cents,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            usage_limit: input.usage_limit,
            per_user_limit: input.per_user_limit,
            times_used: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.ctx.db.coupons().insert(&coupon).await.map_err(|err| {
            if matches!(err, DbError::UniqueViolation { .. }) {
                EngineError::from(ValidationError::Duplicate {
                    field: "code".to_string(),
                    value: code.clone(),
                })
            } else {
                err.into()
            }
        })?;

        info!(coupon_id = %coupon.id, code = %coupon.code, "coupon created");
        self.ctx.audit.record(AuditEvent::new(
            &principal.id,
            AuditAction::CouponCreated,
            &coupon.id,
            &coupon.code,
        ));

        Ok(coupon)
    }

    /// All coupons, newest first. Admin only.
    pub async fn list(&self, principal: &Principal, limit: i64) -> EngineResult<Vec<Coupon>> {
        principal.require_admin()?;
        Ok(self.ctx.db.coupons().list(limit).await?)
    }

    /// Enables or disables a coupon. Admin only.
    ///
    /// Disabled coupons stop validating immediately but keep their usage
    /// history.
    pub async fn set_active(
        &self,
        principal: &Principal,
        id: &str,
        active: bool,
    ) -> EngineResult<()> {
        principal.require_admin()?;

        self.ctx.db.coupons().set_active(id, active).await?;

        self.ctx.audit.record(AuditEvent::new(
            &principal.id,
            AuditAction::CouponToggled,
            id,
            if active { "activated" } else { "deactivated" },
        ));

        Ok(())
    }

    /// Checks a code against a subtotal and reports the discount it
    /// would grant. Mutates nothing.
    ///
    /// `user_id` attributes the check for per-user limits; pass `None`
    /// for anonymous carts (per-user limits are then not enforceable and
    /// are skipped).
    pub async fn validate(
        &self,
        code: &str,
        subtotal: Money,
        user_id: Option<&str>,
    ) -> EngineResult<ValidatedCoupon> {
        let code = normalize_code(code)?;

        let coupon = self
            .ctx
            .db
            .coupons()
            .find_active_by_code(&code)
            .await?
            .ok_or(CouponError::NotFound(code))?;

        let user_uses = match user_id {
            Some(user) if coupon.per_user_limit > 0 => {
                Some(self.ctx.db.coupons().user_uses(&coupon.id, user).await?)
            }
            _ => None,
        };

        let discount = coupon.check(Utc::now(), subtotal, user_uses)?;

        Ok(ValidatedCoupon { coupon, discount })
    }
}
