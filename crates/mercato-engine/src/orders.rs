//! # Order Processing
//!
//! The checkout and fulfillment flow.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Order Service Flow                           │
//! │                                                                     │
//! │  create()                                                           │
//! │    validate lines ──▶ resolve customer ──▶ price cart + coupon      │
//! │    ──▶ transactional create (number, stock, items)                  │
//! │    ──▶ register coupon use ──▶ auto-invoice ──▶ audit + notify      │
//! │                                                                     │
//! │  update_status()               attach_transfer_proof()              │
//! │    pending ──▶ processing        customer submits bank reference    │
//! │    processing ──▶ completed    review_transfer_proof()              │
//! │      └─ points + invoice         approve: confirmed, processing     │
//! │    pending|processing ──▶        reject: rejected, cancelled,       │
//! │      cancelled (restock)                 stock restored             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock is reserved inside the creation transaction and released by
//! cancellation or payment rejection. Coupon usage counters advance only
//! after the order is durable. Points accrue once per order, at
//! completion, guarded by the sentinel on the order row.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mercato_core::{
    compute_totals,
    loyalty::points_for_total,
    validation::{
        validate_discount_cents, validate_line_count, validate_name, validate_quantity,
        validate_reason, validate_uuid,
    },
    CoreError, Customer, FiscalData, Money, Order, OrderItem, OrderStatus, PaymentMethod,
    PaymentStatus, ValidationError,
};
use mercato_db::DbError;

use crate::audit::{AuditAction, AuditEvent};
use crate::commerce::EngineContext;
use crate::coupons::CouponService;
use crate::error::{EngineError, EngineResult};
use crate::invoices::InvoiceService;
use crate::notify::Notification;
use crate::principal::Principal;

// =============================================================================
// Requests and Views
// =============================================================================

/// One cart line.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: i64,
}

/// Customer details for first-time buyers without a stored record.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A cart submission.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Bill to an existing customer record.
    pub customer_id: Option<String>,
    /// Create (or fall back to) a customer record from these details.
    pub customer: Option<NewCustomer>,
    pub items: Vec<OrderLine>,
    pub coupon_code: Option<String>,
    /// Operator-granted discount in cents, on top of any coupon.
    pub manual_discount_cents: i64,
    pub payment_method: PaymentMethod,
    /// Issue an invoice right away when fiscal data is complete.
    pub request_invoice: bool,
    pub fiscal_data: Option<FiscalData>,
}

impl Default for OrderRequest {
    fn default() -> Self {
        OrderRequest {
            customer_id: None,
            customer: None,
            items: Vec::new(),
            coupon_code: None,
            manual_discount_cents: 0,
            payment_method: PaymentMethod::Cash,
            request_invoice: false,
            fiscal_data: None,
        }
    }
}

/// An order with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Bank transfer evidence submitted by the customer.
#[derive(Debug, Clone)]
pub struct TransferProof {
    pub reference: String,
    pub note: Option<String>,
}

/// Admin verdict on a submitted transfer proof.
#[derive(Debug, Clone)]
pub enum ProofReview {
    Approve,
    Reject { reason: String },
}

// =============================================================================
// Order Service
// =============================================================================

/// Checkout, lifecycle, and payment review.
pub struct OrderService {
    ctx: EngineContext,
}

impl OrderService {
    pub(crate) fn new(ctx: EngineContext) -> Self {
        OrderService { ctx }
    }

    /// Places an order.
    ///
    /// Prices the cart from the live catalog, applies coupon and manual
    /// discounts, and creates the order in one transaction that claims
    /// the order number and reserves stock for every line. The order
    /// lands in `pending`; nothing here completes it.
    pub async fn create(
        &self,
        principal: &Principal,
        request: OrderRequest,
    ) -> EngineResult<OrderView> {
        validate_line_count(request.items.len())?;
        validate_discount_cents(request.manual_discount_cents)?;

        let customer = self.resolve_customer(principal, &request).await?;

        let now = Utc::now();
        let order_id = Uuid::new_v4().to_string();

        // Price the cart against the live catalog. The stock read here is
        // advisory; the creation transaction re-checks when it reserves.
        let mut items = Vec::with_capacity(request.items.len());
        let mut product_names: HashMap<String, String> = HashMap::new();
        let mut subtotal = Money::zero();
        for line in &request.items {
            validate_uuid("product_id", &line.product_id)?;
            validate_quantity(line.quantity)?;

            let product = self
                .ctx
                .db
                .products()
                .get_by_id(&line.product_id)
                .await?
                .filter(|p| p.is_active)
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            if !product.has_stock(line.quantity) {
                return Err(CoreError::InsufficientStock {
                    name: product.name.clone(),
                    available: product.stock,
                    requested: line.quantity,
                }
                .into());
            }

            let item = OrderItem::snapshot(&order_id, &product, line.quantity, now);
            subtotal = subtotal + item.line_total();
            product_names.insert(product.id.clone(), product.name);
            items.push(item);
        }

        let validated_coupon = match &request.coupon_code {
            Some(code) => Some(
                self.coupons()
                    .validate(code, subtotal, Some(&principal.id))
                    .await?,
            ),
            None => None,
        };
        let coupon_discount = validated_coupon
            .as_ref()
            .map(|v| v.discount)
            .unwrap_or_else(Money::zero);

        let totals = compute_totals(
            subtotal,
            Money::from_cents(request.manual_discount_cents),
            coupon_discount,
        );

        let fiscal_data_json = request
            .fiscal_data
            .as_ref()
            .filter(|fd| !fd.is_empty())
            .and_then(|fd| serde_json::to_string(fd).ok());

        let draft = Order {
            id: order_id,
            // The number is claimed inside the creation transaction.
            number: String::new(),
            customer_id: customer.id.clone(),
            user_id: customer.user_id.clone(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: request.payment_method,
            subtotal_cents: totals.subtotal_cents,
            discount_cents: totals.discount_cents,
            tax_cents: totals.tax_cents,
            total_cents: totals.total_cents,
            coupon_code: validated_coupon.as_ref().map(|v| v.coupon.code.clone()),
            points_earned: 0,
            transfer_reference: None,
            transfer_note: None,
            proof_submitted_at: None,
            proof_reviewed_by: None,
            proof_reviewed_at: None,
            invoice_id: None,
            fiscal_data_json,
            delivered_at: None,
            cancel_reason: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };

        let mut order = self
            .ctx
            .db
            .orders()
            .create(&draft, &items)
            .await
            .map_err(|err| match err {
                // Re-raise with the product name; the storage layer only
                // knows the id.
                DbError::InsufficientStock {
                    product_id,
                    available,
                    requested,
                } => EngineError::Core(CoreError::InsufficientStock {
                    name: product_names.get(&product_id).cloned().unwrap_or(product_id),
                    available,
                    requested,
                }),
                other => other.into(),
            })?;

        // Usage counters advance only for orders that exist.
        if let Some(validated) = &validated_coupon {
            if let Err(err) = self
                .ctx
                .db
                .coupons()
                .register_use(&validated.coupon.id, Some(&principal.id))
                .await
            {
                warn!(
                    order_id = %order.id,
                    coupon = %validated.coupon.code,
                    error = %err,
                    "coupon use not registered"
                );
            }
        }

        if request.request_invoice {
            if let Some(invoice) = self.ensure_invoice(principal, &order).await {
                order.invoice_id = Some(invoice.id);
            }
        }

        info!(
            order_id = %order.id,
            number = %order.number,
            total_cents = order.total_cents,
            "order created"
        );
        self.ctx.audit.record(AuditEvent::new(
            &principal.id,
            AuditAction::OrderCreated,
            &order.id,
            &order.number,
        ));
        self.ctx.notifier.notify(
            Notification::for_admins("New order", format!("{} for {}", order.number, order.total()))
                .about_order(&order.id),
        );
        if order.payment_method == PaymentMethod::Transfer {
            if let (Some(user_id), Some(instructions)) =
                (&order.user_id, &self.ctx.config.store.bank_instructions)
            {
                self.ctx.notifier.notify(
                    Notification::for_user(user_id, "Payment instructions", instructions)
                        .about_order(&order.id),
                );
            }
        }

        Ok(OrderView { order, items })
    }

    /// One order with items. Customers only reach their own.
    pub async fn get(&self, principal: &Principal, order_id: &str) -> EngineResult<OrderView> {
        let order = self.load(order_id).await?;
        principal.require_access(order.user_id.as_deref())?;

        let items = self.ctx.db.orders().get_items(order_id).await?;
        Ok(OrderView { order, items })
    }

    /// Lists orders, newest first. Admins see everything, optionally
    /// filtered by status; customers see their own orders.
    pub async fn list(
        &self,
        principal: &Principal,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> EngineResult<Vec<Order>> {
        if principal.is_admin() {
            return Ok(self.ctx.db.orders().list(status, limit).await?);
        }

        let mut orders = self.ctx.db.orders().list_by_user(&principal.id, limit).await?;
        if let Some(status) = status {
            orders.retain(|o| o.status == status);
        }
        Ok(orders)
    }

    /// Moves an order along its lifecycle. Admin only.
    ///
    /// `pending → processing`, `processing → completed`, and either into
    /// `cancelled`. Completion stamps delivery, awards points once, and
    /// auto-issues an invoice when fiscal data on file is complete.
    /// Repeating the current status is a no-op, except `completed`,
    /// which re-runs the completion side effects (each is idempotent).
    pub async fn update_status(
        &self,
        principal: &Principal,
        order_id: &str,
        new_status: &str,
    ) -> EngineResult<OrderView> {
        principal.require_admin()?;
        let target: OrderStatus = new_status.parse()?;

        let order = self.load(order_id).await?;

        if order.status == target {
            if target == OrderStatus::Completed {
                self.run_completion_effects(principal, &order).await;
            }
            return self.view(order_id).await;
        }

        if !order.status.can_transition_to(target) {
            return Err(CoreError::InvalidOrderState {
                order_id: order_id.to_string(),
                current_status: order.status.to_string(),
            }
            .into());
        }

        match target {
            OrderStatus::Processing => {
                if !self.ctx.db.orders().mark_processing(order_id).await? {
                    return Err(self.state_conflict(order_id).await);
                }
            }
            OrderStatus::Completed => {
                if !self.ctx.db.orders().complete(order_id).await? {
                    return Err(self.state_conflict(order_id).await);
                }
                let completed = self.load(order_id).await?;
                self.run_completion_effects(principal, &completed).await;
                if let Some(user_id) = &completed.user_id {
                    self.ctx.notifier.notify(
                        Notification::for_user(
                            user_id,
                            "Order completed",
                            format!("{} has been delivered.", completed.number),
                        )
                        .about_order(order_id),
                    );
                }
            }
            OrderStatus::Cancelled => {
                return self.cancel(principal, order_id, None).await;
            }
            // Unreachable through the transition matrix; kept for
            // exhaustiveness.
            OrderStatus::Pending => {
                return Err(CoreError::InvalidOrderState {
                    order_id: order_id.to_string(),
                    current_status: order.status.to_string(),
                }
                .into());
            }
        }

        self.ctx.audit.record(AuditEvent::new(
            &principal.id,
            AuditAction::OrderStatusChanged,
            order_id,
            target.to_string(),
        ));

        self.view(order_id).await
    }

    /// Cancels a pending or processing order and restores its stock.
    /// Admin only.
    pub async fn cancel(
        &self,
        principal: &Principal,
        order_id: &str,
        reason: Option<&str>,
    ) -> EngineResult<OrderView> {
        principal.require_admin()?;
        let reason = match reason {
            Some(r) => Some(validate_reason(r)?),
            None => None,
        };

        let order = self.load(order_id).await?;
        match order.status {
            OrderStatus::Completed => {
                return Err(CoreError::AlreadyCompleted(order_id.to_string()).into())
            }
            OrderStatus::Cancelled => {
                return Err(CoreError::AlreadyCancelled(order_id.to_string()).into())
            }
            _ => {}
        }

        if !self.ctx.db.orders().cancel(order_id, reason.as_deref()).await? {
            return Err(self.state_conflict(order_id).await);
        }

        info!(order_id = %order_id, "order cancelled");
        self.ctx.audit.record(AuditEvent::new(
            &principal.id,
            AuditAction::OrderCancelled,
            order_id,
            reason.as_deref().unwrap_or(""),
        ));

        let view = self.view(order_id).await?;
        if let Some(user_id) = &view.order.user_id {
            self.ctx.notifier.notify(
                Notification::for_user(
                    user_id,
                    "Order cancelled",
                    format!("{} was cancelled.", view.order.number),
                )
                .about_order(order_id),
            );
        }
        Ok(view)
    }

    /// Records the customer's bank transfer reference on a pending
    /// transfer order. Resubmitting replaces the previous proof.
    pub async fn attach_transfer_proof(
        &self,
        principal: &Principal,
        order_id: &str,
        proof: TransferProof,
    ) -> EngineResult<OrderView> {
        let order = self.load(order_id).await?;
        principal.require_access(order.user_id.as_deref())?;

        if order.payment_method != PaymentMethod::Transfer {
            return Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                value: order.payment_method.to_string(),
            }
            .into());
        }

        let reference = proof.reference.trim();
        if reference.is_empty() {
            return Err(ValidationError::Required {
                field: "reference".to_string(),
            }
            .into());
        }

        if !self
            .ctx
            .db
            .orders()
            .attach_proof(order_id, reference, proof.note.as_deref())
            .await?
        {
            return Err(self.state_conflict(order_id).await);
        }

        self.ctx.audit.record(AuditEvent::new(
            &principal.id,
            AuditAction::ProofAttached,
            order_id,
            reference,
        ));
        self.ctx.notifier.notify(
            Notification::for_admins(
                "Transfer proof submitted",
                format!("Order {} awaits payment review.", order.number),
            )
            .about_order(order_id),
        );

        self.view(order_id).await
    }

    /// Settles a submitted transfer proof. Admin only.
    ///
    /// Approval confirms payment and moves the order to `processing`;
    /// rejection cancels the order and restores its stock.
    pub async fn review_transfer_proof(
        &self,
        principal: &Principal,
        order_id: &str,
        review: ProofReview,
    ) -> EngineResult<OrderView> {
        principal.require_admin()?;
        let order = self.load(order_id).await?;

        match review {
            ProofReview::Approve => {
                if !order.has_transfer_proof() {
                    return Err(CoreError::NoProofAttached(order_id.to_string()).into());
                }
                if !self
                    .ctx
                    .db
                    .orders()
                    .confirm_payment(order_id, &principal.id)
                    .await?
                {
                    return Err(self.state_conflict(order_id).await);
                }

                self.ctx.audit.record(AuditEvent::new(
                    &principal.id,
                    AuditAction::PaymentConfirmed,
                    order_id,
                    &order.number,
                ));
                if let Some(user_id) = &order.user_id {
                    self.ctx.notifier.notify(
                        Notification::for_user(
                            user_id,
                            "Payment confirmed",
                            format!("{} is now being prepared.", order.number),
                        )
                        .about_order(order_id),
                    );
                }
            }
            ProofReview::Reject { reason } => {
                let reason = validate_reason(&reason)?;
                if !self
                    .ctx
                    .db
                    .orders()
                    .reject_payment(order_id, &principal.id, &reason)
                    .await?
                {
                    return Err(self.state_conflict(order_id).await);
                }

                self.ctx.audit.record(AuditEvent::new(
                    &principal.id,
                    AuditAction::PaymentRejected,
                    order_id,
                    &reason,
                ));
                if let Some(user_id) = &order.user_id {
                    self.ctx.notifier.notify(
                        Notification::for_user(user_id, "Payment rejected", reason)
                            .about_order(order_id),
                    );
                }
            }
        }

        self.view(order_id).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn coupons(&self) -> CouponService {
        CouponService::new(self.ctx.clone())
    }

    fn invoices(&self) -> InvoiceService {
        InvoiceService::new(self.ctx.clone())
    }

    async fn load(&self, order_id: &str) -> EngineResult<Order> {
        self.ctx
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()).into())
    }

    async fn view(&self, order_id: &str) -> EngineResult<OrderView> {
        let order = self.load(order_id).await?;
        let items = self.ctx.db.orders().get_items(order_id).await?;
        Ok(OrderView { order, items })
    }

    /// Builds the error for a guarded update that matched no rows: the
    /// order either vanished or sits in a state the update refuses.
    async fn state_conflict(&self, order_id: &str) -> EngineError {
        match self.ctx.db.orders().get_by_id(order_id).await {
            Ok(Some(order)) => CoreError::InvalidOrderState {
                order_id: order_id.to_string(),
                current_status: order.status.to_string(),
            }
            .into(),
            Ok(None) => CoreError::OrderNotFound(order_id.to_string()).into(),
            Err(err) => err.into(),
        }
    }

    /// Finds the customer record this order bills to, creating one from
    /// the request details when the caller has none on file.
    async fn resolve_customer(
        &self,
        principal: &Principal,
        request: &OrderRequest,
    ) -> EngineResult<Customer> {
        if let Some(customer_id) = &request.customer_id {
            let customer = self
                .ctx
                .db
                .customers()
                .get_by_id(customer_id)
                .await?
                .ok_or_else(|| CoreError::CustomerNotFound(customer_id.clone()))?;
            if !principal.can_access(customer.user_id.as_deref()) {
                return Err(EngineError::Forbidden(
                    "customer record belongs to another user".to_string(),
                ));
            }
            return Ok(customer);
        }

        if let Some(existing) = self.ctx.db.customers().get_by_user_id(&principal.id).await? {
            return Ok(existing);
        }

        let details = request.customer.as_ref().ok_or(ValidationError::Required {
            field: "customer".to_string(),
        })?;
        let name = validate_name(&details.name)?;

        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            // Walk-in customers created by staff have no storefront login.
            user_id: (!principal.is_admin()).then(|| principal.id.clone()),
            name,
            email: details.email.clone(),
            phone: details.phone.clone(),
            billing_name: None,
            billing_tax_id: None,
            billing_address: None,
            billing_email: None,
            billing_phone: None,
            created_at: now,
            updated_at: now,
        };
        self.ctx.db.customers().insert(&customer).await?;
        debug!(customer_id = %customer.id, "customer created at checkout");
        Ok(customer)
    }

    /// Issues the invoice for this order when possible; failures are
    /// logged, never raised.
    async fn ensure_invoice(&self, principal: &Principal, order: &Order) -> Option<mercato_core::Invoice> {
        match self.invoices().issue_if_missing(order).await {
            Ok(Some(invoice)) => {
                self.ctx.audit.record(AuditEvent::new(
                    &principal.id,
                    AuditAction::InvoiceCreated,
                    &invoice.id,
                    &invoice.number,
                ));
                Some(invoice)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(order_id = %order.id, error = %err, "invoice not auto-issued");
                None
            }
        }
    }

    /// Completion side effects: point accrual and invoice issuing. Both
    /// are idempotent, so replays repair rather than duplicate.
    async fn run_completion_effects(&self, principal: &Principal, order: &Order) {
        if let Some(user_id) = &order.user_id {
            let points = points_for_total(order.total_cents);
            match self
                .ctx
                .db
                .orders()
                .award_points(&order.id, Some(user_id), points)
                .await
            {
                Ok(true) => {
                    self.ctx.audit.record(AuditEvent::new(
                        &principal.id,
                        AuditAction::PointsAwarded,
                        &order.id,
                        format!("{} points", points),
                    ));
                    self.ctx.notifier.notify(
                        Notification::for_user(
                            user_id,
                            "Points earned",
                            format!("You earned {} points on {}.", points, order.number),
                        )
                        .about_order(&order.id),
                    );
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(order_id = %order.id, error = %err, "points not awarded");
                }
            }
        }

        self.ensure_invoice(principal, order).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupons::NewCoupon;
    use crate::testing::{complete_order, request_for, seed_product, test_commerce};
    use chrono::Duration;
    use mercato_core::DiscountKind;

    #[tokio::test]
    async fn test_create_prices_cart_and_reserves_stock() {
        let commerce = test_commerce().await;
        let customer = Principal::customer("user-1");
        let product = seed_product(&commerce, "Ceramic Mug", 2_500, 10).await;

        let view = commerce
            .orders()
            .create(&customer, request_for(&product, 2))
            .await
            .unwrap();

        assert!(view.order.number.starts_with("ORD-"));
        assert!(view.order.number.ends_with("-00001"));
        assert_eq!(view.order.status, OrderStatus::Pending);
        assert_eq!(view.order.subtotal_cents, 5_000);
        assert_eq!(view.order.tax_cents, 0);
        assert_eq!(view.order.total_cents, 5_000);
        assert_eq!(view.order.user_id.as_deref(), Some("user-1"));
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].name_snapshot, "Ceramic Mug");

        let product = commerce.db().products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(product.stock, 8);
    }

    #[tokio::test]
    async fn test_capped_coupon_applies_and_registers_use() {
        let commerce = test_commerce().await;
        let admin = Principal::admin("staff-1");
        let customer = Principal::customer("user-1");
        let product = seed_product(&commerce, "Espresso Machine", 10_000, 5).await;

        let coupon = commerce
            .coupons()
            .create(
                &admin,
                NewCoupon {
                    code: "SAVE10".to_string(),
                    kind: DiscountKind::Percentage,
                    value: 10,
                    max_discount_cents: Some(500),
                    ..NewCoupon::default()
                },
            )
            .await
            .unwrap();

        let mut request = request_for(&product, 1);
        request.coupon_code = Some("save10".to_string());
        let view = commerce.orders().create(&customer, request).await.unwrap();

        // 10% of $100.00 capped at $5.00.
        assert_eq!(view.order.discount_cents, 500);
        assert_eq!(view.order.total_cents, 9_500);
        assert_eq!(view.order.coupon_code.as_deref(), Some("SAVE10"));

        let coupon = commerce.db().coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(coupon.times_used, 1);
    }

    #[tokio::test]
    async fn test_rejected_coupon_aborts_creation() {
        let commerce = test_commerce().await;
        let admin = Principal::admin("staff-1");
        let customer = Principal::customer("user-1");
        let product = seed_product(&commerce, "Mug", 5_000, 10).await;

        let now = Utc::now();
        let coupon = commerce
            .coupons()
            .create(
                &admin,
                NewCoupon {
                    code: "OLD".to_string(),
                    kind: DiscountKind::FixedAmount,
                    value: 500,
                    starts_at: Some(now - Duration::days(30)),
                    ends_at: Some(now - Duration::days(1)),
                    ..NewCoupon::default()
                },
            )
            .await
            .unwrap();

        let mut request = request_for(&product, 2);
        request.coupon_code = Some("OLD".to_string());
        let err = commerce.orders().create(&customer, request).await.unwrap_err();
        assert!(err.is_conflict());

        // Nothing moved: no order, no stock change, no use recorded.
        assert!(commerce.orders().list(&admin, None, 50).await.unwrap().is_empty());
        let product = commerce.db().products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(product.stock, 10);
        let coupon = commerce.db().coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(coupon.times_used, 0);
    }

    #[tokio::test]
    async fn test_insufficient_stock_names_the_product() {
        let commerce = test_commerce().await;
        let customer = Principal::customer("user-1");
        let product = seed_product(&commerce, "Rare Vinyl", 8_000, 1).await;

        let err = commerce
            .orders()
            .create(&customer, request_for(&product, 3))
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        let message = err.to_string();
        assert!(message.contains("Rare Vinyl"));
        assert!(message.contains('1'));
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let commerce = test_commerce().await;
        let customer = Principal::customer("user-1");

        let err = commerce
            .orders()
            .create(&customer, OrderRequest::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_customer_record_reused_across_orders() {
        let commerce = test_commerce().await;
        let customer = Principal::customer("user-1");
        let product = seed_product(&commerce, "Mug", 1_000, 10).await;

        let first = commerce
            .orders()
            .create(&customer, request_for(&product, 1))
            .await
            .unwrap();
        let second = commerce
            .orders()
            .create(&customer, request_for(&product, 1))
            .await
            .unwrap();

        assert_eq!(first.order.customer_id, second.order.customer_id);
        assert_eq!(second.order.number.split('-').last(), Some("00002"));
    }

    #[tokio::test]
    async fn test_unknown_customer_reference_rejected() {
        let commerce = test_commerce().await;
        let product = seed_product(&commerce, "Mug", 1_000, 10).await;

        let mut request = request_for(&product, 1);
        request.customer_id = Some(Uuid::new_v4().to_string());
        let err = commerce
            .orders()
            .create(&Principal::admin("staff-1"), request)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_completion_awards_points_exactly_once() {
        let commerce = test_commerce().await;
        let admin = Principal::admin("staff-1");
        let customer = Principal::customer("user-1");
        let product = seed_product(&commerce, "Armchair", 9_500, 3).await;

        let view = commerce
            .orders()
            .create(&customer, request_for(&product, 1))
            .await
            .unwrap();
        let completed = complete_order(&commerce, &admin, &view.order.id).await;

        assert_eq!(completed.order.status, OrderStatus::Completed);
        assert!(completed.order.delivered_at.is_some());
        assert_eq!(completed.order.points_earned, 95);

        let account = commerce
            .loyalty()
            .balance(&admin, "user-1")
            .await
            .unwrap();
        assert_eq!(account.points, 95);

        // Replaying the completion repairs, never double-credits.
        commerce
            .orders()
            .update_status(&admin, &view.order.id, "completed")
            .await
            .unwrap();
        let account = commerce.loyalty().balance(&admin, "user-1").await.unwrap();
        assert_eq!(account.points, 95);
    }

    #[tokio::test]
    async fn test_illegal_transition_rejected() {
        let commerce = test_commerce().await;
        let admin = Principal::admin("staff-1");
        let customer = Principal::customer("user-1");
        let product = seed_product(&commerce, "Mug", 1_000, 5).await;

        let view = commerce
            .orders()
            .create(&customer, request_for(&product, 1))
            .await
            .unwrap();

        // Pending orders cannot jump straight to completed.
        let err = commerce
            .orders()
            .update_status(&admin, &view.order.id, "completed")
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let err = commerce
            .orders()
            .update_status(&admin, &view.order.id, "shipped")
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let commerce = test_commerce().await;
        let admin = Principal::admin("staff-1");
        let customer = Principal::customer("user-1");
        let product = seed_product(&commerce, "Mug", 1_000, 10).await;

        let view = commerce
            .orders()
            .create(&customer, request_for(&product, 4))
            .await
            .unwrap();
        let stocked = commerce.db().products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stocked.stock, 6);

        let cancelled = commerce
            .orders()
            .cancel(&admin, &view.order.id, Some("out of delivery range"))
            .await
            .unwrap();
        assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
        assert_eq!(
            cancelled.order.cancel_reason.as_deref(),
            Some("out of delivery range")
        );

        let restocked = commerce.db().products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(restocked.stock, 10);

        let err = commerce
            .orders()
            .cancel(&admin, &view.order.id, None)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("already cancelled"));
    }

    #[tokio::test]
    async fn test_cancel_completed_rejected() {
        let commerce = test_commerce().await;
        let admin = Principal::admin("staff-1");
        let customer = Principal::customer("user-1");
        let product = seed_product(&commerce, "Mug", 1_000, 5).await;

        let view = commerce
            .orders()
            .create(&customer, request_for(&product, 1))
            .await
            .unwrap();
        complete_order(&commerce, &admin, &view.order.id).await;

        let err = commerce
            .orders()
            .cancel(&admin, &view.order.id, None)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("already completed"));
    }

    #[tokio::test]
    async fn test_transfer_proof_flow() {
        let commerce = test_commerce().await;
        let admin = Principal::admin("staff-1");
        let customer = Principal::customer("user-1");
        let product = seed_product(&commerce, "Mug", 2_000, 5).await;

        let mut request = request_for(&product, 1);
        request.payment_method = PaymentMethod::Transfer;
        let view = commerce.orders().create(&customer, request).await.unwrap();

        // No proof yet: approval refused.
        let err = commerce
            .orders()
            .review_transfer_proof(&admin, &view.order.id, ProofReview::Approve)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("no payment proof"));

        let view = commerce
            .orders()
            .attach_transfer_proof(
                &customer,
                &view.order.id,
                TransferProof {
                    reference: "  SPEI-778431  ".to_string(),
                    note: Some("sent from my savings account".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(view.order.transfer_reference.as_deref(), Some("SPEI-778431"));
        assert!(view.order.proof_submitted_at.is_some());

        let approved = commerce
            .orders()
            .review_transfer_proof(&admin, &view.order.id, ProofReview::Approve)
            .await
            .unwrap();
        assert_eq!(approved.order.status, OrderStatus::Processing);
        assert_eq!(approved.order.payment_status, PaymentStatus::Confirmed);
        assert_eq!(approved.order.proof_reviewed_by.as_deref(), Some("staff-1"));
    }

    #[tokio::test]
    async fn test_attach_proof_refused_for_cash_orders() {
        let commerce = test_commerce().await;
        let customer = Principal::customer("user-1");
        let product = seed_product(&commerce, "Mug", 2_000, 5).await;

        let view = commerce
            .orders()
            .create(&customer, request_for(&product, 1))
            .await
            .unwrap();

        let err = commerce
            .orders()
            .attach_transfer_proof(
                &customer,
                &view.order.id,
                TransferProof {
                    reference: "SPEI-1".to_string(),
                    note: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("payment_method"));
    }

    #[tokio::test]
    async fn test_rejected_payment_cancels_and_restocks() {
        let commerce = test_commerce().await;
        let admin = Principal::admin("staff-1");
        let customer = Principal::customer("user-1");
        let product = seed_product(&commerce, "Mug", 2_000, 5).await;

        let mut request = request_for(&product, 2);
        request.payment_method = PaymentMethod::Transfer;
        let view = commerce.orders().create(&customer, request).await.unwrap();

        commerce
            .orders()
            .attach_transfer_proof(
                &customer,
                &view.order.id,
                TransferProof {
                    reference: "SPEI-1".to_string(),
                    note: None,
                },
            )
            .await
            .unwrap();

        let rejected = commerce
            .orders()
            .review_transfer_proof(
                &admin,
                &view.order.id,
                ProofReview::Reject {
                    reason: "reference not found in statement".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(rejected.order.status, OrderStatus::Cancelled);
        assert_eq!(rejected.order.payment_status, PaymentStatus::Rejected);
        assert_eq!(
            rejected.order.cancel_reason.as_deref(),
            Some("reference not found in statement")
        );

        let product = commerce.db().products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(product.stock, 5);
    }

    #[tokio::test]
    async fn test_customers_cannot_drive_lifecycle() {
        let commerce = test_commerce().await;
        let customer = Principal::customer("user-1");
        let product = seed_product(&commerce, "Mug", 1_000, 5).await;

        let view = commerce
            .orders()
            .create(&customer, request_for(&product, 1))
            .await
            .unwrap();

        let err = commerce
            .orders()
            .update_status(&customer, &view.order.id, "processing")
            .await
            .unwrap_err();
        assert!(err.is_forbidden());

        let err = commerce
            .orders()
            .cancel(&customer, &view.order.id, None)
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
    }

    #[tokio::test]
    async fn test_order_visibility() {
        let commerce = test_commerce().await;
        let admin = Principal::admin("staff-1");
        let alice = Principal::customer("user-1");
        let bob = Principal::customer("user-2");
        let product = seed_product(&commerce, "Mug", 1_000, 10).await;

        let theirs = commerce
            .orders()
            .create(&alice, request_for(&product, 1))
            .await
            .unwrap();
        commerce
            .orders()
            .create(&bob, request_for(&product, 1))
            .await
            .unwrap();

        let err = commerce.orders().get(&bob, &theirs.order.id).await.unwrap_err();
        assert!(err.is_forbidden());
        assert!(commerce.orders().get(&admin, &theirs.order.id).await.is_ok());

        assert_eq!(commerce.orders().list(&alice, None, 50).await.unwrap().len(), 1);
        assert_eq!(commerce.orders().list(&admin, None, 50).await.unwrap().len(), 2);
        assert_eq!(
            commerce
                .orders()
                .list(&admin, Some(OrderStatus::Cancelled), 50)
                .await
                .unwrap()
                .len(),
            0
        );
    }

    #[tokio::test]
    async fn test_invoice_issued_at_checkout_when_requested() {
        let commerce = test_commerce().await;
        let customer = Principal::customer("user-1");
        let product = seed_product(&commerce, "Mug", 10_000, 5).await;

        let mut request = request_for(&product, 1);
        request.request_invoice = true;
        request.fiscal_data = Some(FiscalData {
            name: Some("Reyes Consulting SA".to_string()),
            tax_id: Some("REYD850101ABC".to_string()),
            ..FiscalData::default()
        });
        let view = commerce.orders().create(&customer, request).await.unwrap();

        let invoice_id = view.order.invoice_id.expect("invoice issued at checkout");
        let invoice = commerce.invoices().get(&customer, &invoice_id).await.unwrap();
        assert_eq!(invoice.invoice.fiscal_name, "Reyes Consulting SA");
        assert_eq!(invoice.invoice.tax_cents, 1_300);
        assert_eq!(invoice.invoice.total_cents, 11_300);

        // The link is persisted, not just returned.
        let stored = commerce.orders().get(&customer, &view.order.id).await.unwrap();
        assert_eq!(stored.order.invoice_id.as_deref(), Some(invoice_id.as_str()));
    }

    #[tokio::test]
    async fn test_oversized_manual_discount_clamped() {
        let commerce = test_commerce().await;
        let customer = Principal::customer("user-1");
        let product = seed_product(&commerce, "Mug", 1_000, 5).await;

        let mut request = request_for(&product, 1);
        request.manual_discount_cents = 99_999;
        let view = commerce.orders().create(&customer, request).await.unwrap();

        assert_eq!(view.order.discount_cents, 1_000);
        assert_eq!(view.order.total_cents, 0);
    }
}
