//! # Commerce Facade
//!
//! Wires the database, configuration, and sinks together and hands out
//! the per-domain services.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Commerce                                │
//! │                                                                 │
//! │   Database ──┐                                                  │
//! │   Config ────┼──▶ EngineContext ──▶ catalog() CatalogService    │
//! │   AuditSink ─┤                      coupons() CouponService     │
//! │   Notifier ──┤                      loyalty() LoyaltyService    │
//! │   Renderer ──┘                      orders()  OrderService      │
//! │                                     invoices() InvoiceService   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Services are cheap throwaway handles over the shared context; grab a
//! fresh one per call site rather than storing them.

use std::sync::Arc;

use mercato_db::Database;

use crate::audit::{AuditSink, LogAuditSink};
use crate::catalog::CatalogService;
use crate::config::CommerceConfig;
use crate::coupons::CouponService;
use crate::invoices::InvoiceService;
use crate::loyalty::LoyaltyService;
use crate::notify::{LogNotificationSink, NotificationSink};
use crate::orders::OrderService;
use crate::render::{DocumentRenderer, TextRenderer};

/// Shared state behind every service handle.
#[derive(Clone)]
pub(crate) struct EngineContext {
    pub db: Database,
    pub config: Arc<CommerceConfig>,
    pub audit: Arc<dyn AuditSink>,
    pub notifier: Arc<dyn NotificationSink>,
    pub renderer: Arc<dyn DocumentRenderer>,
}

/// Engine entry point.
pub struct Commerce {
    ctx: EngineContext,
}

impl Commerce {
    /// Builds the engine with log-backed sinks and the plain text
    /// invoice renderer. Swap pieces with the `with_*` builders.
    pub fn new(db: Database, config: CommerceConfig) -> Self {
        let renderer: Arc<dyn DocumentRenderer> = Arc::new(TextRenderer::new(config.store.clone()));
        Commerce {
            ctx: EngineContext {
                db,
                config: Arc::new(config),
                audit: Arc::new(LogAuditSink),
                notifier: Arc::new(LogNotificationSink),
                renderer,
            },
        }
    }

    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.ctx.audit = sink;
        self
    }

    pub fn with_notifications(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.ctx.notifier = sink;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.ctx.renderer = renderer;
        self
    }

    pub fn config(&self) -> &CommerceConfig {
        &self.ctx.config
    }

    pub fn db(&self) -> &Database {
        &self.ctx.db
    }

    // =========================================================================
    // Services
    // =========================================================================

    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.ctx.clone())
    }

    pub fn coupons(&self) -> CouponService {
        CouponService::new(self.ctx.clone())
    }

    pub fn loyalty(&self) -> LoyaltyService {
        LoyaltyService::new(self.ctx.clone())
    }

    pub fn orders(&self) -> OrderService {
        OrderService::new(self.ctx.clone())
    }

    pub fn invoices(&self) -> InvoiceService {
        InvoiceService::new(self.ctx.clone())
    }
}
