//! # Invoice Issuing
//!
//! Turns completed orders into fiscal documents.
//!
//! ## Fiscal Data Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  highest   explicit request data (this call)                    │
//! │     │      order fiscal data (captured at checkout)             │
//! │     │      customer billing profile                             │
//! │  lowest    bare customer record (name, email, phone)            │
//! │                                                                 │
//! │  Per field, the first non-empty value wins. Issuing requires    │
//! │  legal name and tax id after the merge.                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Orders carry tax-inclusive prices and no tax line; the invoice is
//! where tax appears, computed on the discounted base. One invoice per
//! order, numbered per day in the creation transaction.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mercato_core::{
    invoice_totals, validation::validate_reason, CoreError, FiscalData, Invoice, InvoiceItem,
    InvoiceStatus, Money, Order, OrderStatus, ValidationError,
};
use mercato_db::{DbError, InvoiceStats};

use crate::audit::{AuditAction, AuditEvent};
use crate::commerce::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::principal::Principal;

/// An invoice with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceView {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

/// Invoice issuing and lifecycle.
pub struct InvoiceService {
    ctx: EngineContext,
}

impl InvoiceService {
    pub(crate) fn new(ctx: EngineContext) -> Self {
        InvoiceService { ctx }
    }

    /// Issues the invoice for a completed order.
    ///
    /// Customers may invoice their own orders; admins any order. The
    /// merged fiscal data must carry a legal name and tax id.
    pub async fn create_for_order(
        &self,
        principal: &Principal,
        order_id: &str,
        fiscal: Option<FiscalData>,
    ) -> EngineResult<InvoiceView> {
        let order = self.load_order(order_id).await?;
        principal.require_access(order.user_id.as_deref())?;

        if order.status != OrderStatus::Completed {
            return Err(CoreError::OrderNotCompleted(order_id.to_string()).into());
        }
        if self.ctx.db.invoices().get_by_order(order_id).await?.is_some() {
            return Err(CoreError::InvoiceAlreadyExists(order_id.to_string()).into());
        }

        let fiscal = self.resolve_fiscal(&order, fiscal).await?;
        let fiscal_name = require_complete(&fiscal)?;

        let (invoice, items) = match self.issue(&order, fiscal, fiscal_name).await {
            Ok(issued) => issued,
            // One invoice per order is also enforced by the schema; a
            // concurrent issue surfaces here.
            Err(EngineError::Db(DbError::UniqueViolation { .. })) => {
                return Err(CoreError::InvoiceAlreadyExists(order_id.to_string()).into())
            }
            Err(err) => return Err(err),
        };

        self.ctx.audit.record(AuditEvent::new(
            &principal.id,
            AuditAction::InvoiceCreated,
            &invoice.id,
            &invoice.number,
        ));

        Ok(InvoiceView { invoice, items })
    }

    /// Issues an invoice for this order if none exists and the fiscal
    /// data on file is complete. Used by the order flow at checkout and
    /// completion; quietly does nothing when prerequisites are missing.
    pub(crate) async fn issue_if_missing(&self, order: &Order) -> EngineResult<Option<Invoice>> {
        if order.invoice_id.is_some()
            || self.ctx.db.invoices().get_by_order(&order.id).await?.is_some()
        {
            return Ok(None);
        }

        let fiscal = self.resolve_fiscal(order, None).await?;
        if !fiscal.is_complete() {
            debug!(order_id = %order.id, "fiscal data incomplete, invoice not auto-issued");
            return Ok(None);
        }
        let fiscal_name = require_complete(&fiscal)?;

        match self.issue(order, fiscal, fiscal_name).await {
            Ok((invoice, _)) => {
                info!(order_id = %order.id, number = %invoice.number, "invoice auto-issued");
                Ok(Some(invoice))
            }
            Err(EngineError::Db(DbError::UniqueViolation { .. })) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// One invoice with items. Customers only reach invoices for their
    /// own orders.
    pub async fn get(&self, principal: &Principal, id: &str) -> EngineResult<InvoiceView> {
        let invoice = self.load_invoice(id).await?;
        self.check_invoice_access(principal, &invoice).await?;

        let items = self.ctx.db.invoices().get_items(&invoice.id).await?;
        Ok(InvoiceView { invoice, items })
    }

    /// The invoice issued for an order, if any.
    pub async fn get_by_order(
        &self,
        principal: &Principal,
        order_id: &str,
    ) -> EngineResult<Option<InvoiceView>> {
        let order = self.load_order(order_id).await?;
        principal.require_access(order.user_id.as_deref())?;

        match self.ctx.db.invoices().get_by_order(order_id).await? {
            Some(invoice) => {
                let items = self.ctx.db.invoices().get_items(&invoice.id).await?;
                Ok(Some(InvoiceView { invoice, items }))
            }
            None => Ok(None),
        }
    }

    /// Lists invoices, optionally by status, newest first. Admin only.
    pub async fn list(
        &self,
        principal: &Principal,
        status: Option<InvoiceStatus>,
        limit: i64,
    ) -> EngineResult<Vec<Invoice>> {
        principal.require_admin()?;
        Ok(self.ctx.db.invoices().list(status, limit).await?)
    }

    /// Marks an issued invoice as paid. Admin only.
    pub async fn mark_paid(&self, principal: &Principal, id: &str) -> EngineResult<Invoice> {
        principal.require_admin()?;

        if !self.ctx.db.invoices().mark_paid(id).await? {
            let invoice = self.load_invoice(id).await?;
            return Err(CoreError::InvalidInvoiceStatus {
                invoice_id: id.to_string(),
                current_status: invoice.status.to_string(),
            }
            .into());
        }

        let invoice = self.load_invoice(id).await?;
        self.ctx.audit.record(AuditEvent::new(
            &principal.id,
            AuditAction::InvoicePaid,
            &invoice.id,
            &invoice.number,
        ));
        Ok(invoice)
    }

    /// Voids an issued or paid invoice with a reason. Admin only.
    ///
    /// Voided invoices stay on the books for numbering continuity but
    /// drop out of revenue statistics.
    pub async fn void(&self, principal: &Principal, id: &str, reason: &str) -> EngineResult<Invoice> {
        principal.require_admin()?;
        let reason = validate_reason(reason)?;

        if !self.ctx.db.invoices().void(id, &reason).await? {
            let invoice = self.load_invoice(id).await?;
            return Err(CoreError::InvalidInvoiceStatus {
                invoice_id: id.to_string(),
                current_status: invoice.status.to_string(),
            }
            .into());
        }

        let invoice = self.load_invoice(id).await?;
        warn!(invoice_id = %id, number = %invoice.number, reason = %reason, "invoice voided");
        self.ctx.audit.record(AuditEvent::new(
            &principal.id,
            AuditAction::InvoiceVoided,
            &invoice.id,
            &reason,
        ));
        Ok(invoice)
    }

    /// Issued / paid / voided counts and revenue totals. Admin only.
    pub async fn stats(&self, principal: &Principal) -> EngineResult<InvoiceStats> {
        principal.require_admin()?;
        Ok(self.ctx.db.invoices().stats().await?)
    }

    /// Renders the printable document for an invoice.
    pub async fn render(&self, principal: &Principal, id: &str) -> EngineResult<Vec<u8>> {
        let invoice = self.load_invoice(id).await?;
        self.check_invoice_access(principal, &invoice).await?;

        let items = self.ctx.db.invoices().get_items(&invoice.id).await?;
        self.ctx.renderer.render(&invoice, &items)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn load_order(&self, order_id: &str) -> EngineResult<Order> {
        self.ctx
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()).into())
    }

    async fn load_invoice(&self, id: &str) -> EngineResult<Invoice> {
        self.ctx
            .db
            .invoices()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()).into())
    }

    /// Ownership runs through the order the invoice was issued for.
    async fn check_invoice_access(
        &self,
        principal: &Principal,
        invoice: &Invoice,
    ) -> EngineResult<()> {
        if principal.is_admin() {
            return Ok(());
        }
        let order = self.load_order(&invoice.order_id).await?;
        principal.require_access(order.user_id.as_deref())
    }

    /// Merges fiscal data sources, strongest first.
    async fn resolve_fiscal(
        &self,
        order: &Order,
        explicit: Option<FiscalData>,
    ) -> EngineResult<FiscalData> {
        let customer = self
            .ctx
            .db
            .customers()
            .get_by_id(&order.customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(order.customer_id.clone()))?;

        let stored = order.fiscal_data().unwrap_or_default();
        Ok(explicit
            .unwrap_or_default()
            .overlay(&stored)
            .overlay(&customer.billing_profile())
            .overlay(&customer.bare_profile()))
    }

    /// Builds and persists the invoice, then links it to the order.
    async fn issue(
        &self,
        order: &Order,
        fiscal: FiscalData,
        fiscal_name: String,
    ) -> EngineResult<(Invoice, Vec<InvoiceItem>)> {
        let order_items = self.ctx.db.orders().get_items(&order.id).await?;
        let totals = invoice_totals(
            order.subtotal(),
            Money::from_cents(order.discount_cents),
            self.ctx.config.invoice_tax_rate(),
        );

        let invoice_id = Uuid::new_v4().to_string();
        let draft = Invoice {
            id: invoice_id.clone(),
            // The number is claimed inside the creation transaction.
            number: String::new(),
            order_id: order.id.clone(),
            customer_id: order.customer_id.clone(),
            fiscal_name,
            fiscal_tax_id: fiscal.tax_id,
            fiscal_address: fiscal.address,
            fiscal_email: fiscal.email,
            fiscal_phone: fiscal.phone,
            subtotal_cents: order.subtotal_cents,
            discount_cents: order.discount_cents,
            tax_cents: totals.tax_cents,
            total_cents: totals.total_cents,
            payment_method: order.payment_method,
            status: InvoiceStatus::Issued,
            issued_at: Utc::now(),
            paid_at: None,
            voided_at: None,
            void_reason: None,
        };
        let items: Vec<InvoiceItem> = order_items
            .iter()
            .map(|item| InvoiceItem::from_order_item(&invoice_id, item))
            .collect();

        let invoice = self.ctx.db.invoices().create(&draft, &items).await?;
        self.ctx.db.orders().link_invoice(&order.id, &invoice.id).await?;

        Ok((invoice, items))
    }
}

/// The merged fiscal data must name the customer and their tax id.
/// Returns the legal name for the invoice row.
fn require_complete(fiscal: &FiscalData) -> EngineResult<String> {
    match (&fiscal.name, &fiscal.tax_id) {
        (Some(name), Some(_)) => Ok(name.clone()),
        (None, _) => Err(ValidationError::Required {
            field: "fiscal_data.name".to_string(),
        }
        .into()),
        (_, None) => Err(ValidationError::Required {
            field: "fiscal_data.tax_id".to_string(),
        }
        .into()),
    }
}
