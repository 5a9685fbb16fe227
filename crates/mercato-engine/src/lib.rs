//! # mercato-engine: Commerce Services for Mercato
//!
//! This crate wires the domain rules from `mercato-core` and the storage
//! layer from `mercato-db` into the services a storefront or back office
//! calls. Every operation takes the calling [`Principal`] and enforces
//! role and ownership checks before touching storage.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Commerce Engine                             │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                     Commerce (facade)                         │  │
//! │  │                                                               │  │
//! │  │  Owns the database handle, configuration, and sinks           │  │
//! │  │  Hands out per-call service handles                           │  │
//! │  └───────────────────────────────┬───────────────────────────────┘  │
//! │                                  │                                  │
//! │     ┌──────────┬──────────┬──────┴─────┬────────────┐               │
//! │     ▼          ▼          ▼            ▼            ▼               │
//! │  ┌───────┐ ┌────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐         │
//! │  │Catalog│ │Coupons │ │ Loyalty │ │ Orders  │ │ Invoices │         │
//! │  │       │ │        │ │         │ │         │ │          │         │
//! │  │create │ │create  │ │balance  │ │create   │ │create    │         │
//! │  │update │ │validate│ │redeem   │ │status   │ │pay/void  │         │
//! │  │list   │ │toggle  │ │         │ │proofs   │ │render    │         │
//! │  └───────┘ └────────┘ └─────────┘ └────┬────┘ └────┬─────┘         │
//! │                                        │           │               │
//! │            orders auto-issue invoices ─┘───────────┘               │
//! │                                                                     │
//! │  SIDE CHANNELS (never fail the caller):                             │
//! │  • AuditSink        - who did what, for the back office trail       │
//! │  • NotificationSink - customer and admin messages                   │
//! │  • DocumentRenderer - printable invoice documents                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! ### Services
//! - [`catalog`] - Product management and storefront listings
//! - [`coupons`] - Discount code administration and validation
//! - [`loyalty`] - Point balances and redemption into coupons
//! - [`orders`] - Checkout, lifecycle, and transfer payment review
//! - [`invoices`] - Invoice issuing, settlement, and rendering
//!
//! ### Infrastructure
//! - [`commerce`] - The [`Commerce`] facade and shared context
//! - [`config`] - Engine configuration (store identity, tax, loyalty)
//! - [`error`] - Engine error type and outcome classification
//! - [`principal`] - Caller identity and access checks
//! - [`audit`] - Audit trail sink
//! - [`notify`] - Notification sink
//! - [`render`] - Invoice document rendering
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mercato_db::Database;
//! use mercato_engine::{Commerce, CommerceConfig, OrderRequest, Principal};
//!
//! let db = Database::new(DbConfig::new("mercato.db")).await?;
//! let commerce = Commerce::new(db, CommerceConfig::load_or_default(None));
//!
//! let customer = Principal::customer("user-1");
//! let view = commerce.orders().create(&customer, request).await?;
//! println!("placed {}", view.order.number);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

// Services
pub mod catalog;
pub mod coupons;
pub mod invoices;
pub mod loyalty;
pub mod orders;

// Infrastructure
pub mod audit;
pub mod commerce;
pub mod config;
pub mod error;
pub mod notify;
pub mod principal;
pub mod render;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

// Facade and infrastructure
pub use commerce::Commerce;
pub use config::{CommerceConfig, LoyaltyConfig, StoreConfig, TaxConfig};
pub use error::{EngineError, EngineResult};
pub use principal::{Principal, Role};

// Service handles
pub use catalog::{CatalogService, NewProduct, ProductUpdate};
pub use coupons::{CouponService, NewCoupon, ValidatedCoupon};
pub use invoices::{InvoiceService, InvoiceView};
pub use loyalty::{LoyaltyService, Redemption};
pub use orders::{
    NewCustomer, OrderLine, OrderRequest, OrderService, OrderView, ProofReview, TransferProof,
};

// Side channels
pub use audit::{AuditAction, AuditEvent, AuditSink, ChannelAuditSink, LogAuditSink};
pub use notify::{
    ChannelNotificationSink, LogNotificationSink, Notification, NotificationSink, Recipient,
};
pub use render::{DocumentRenderer, TextRenderer};
