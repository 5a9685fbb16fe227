//! # Mercato DB
//!
//! Database layer for the Mercato backend. Owns the SQLite connection
//! pool, embedded migrations and the repositories.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     mercato-db                       │
//! │                                                      │
//! │  ┌────────┐   ┌────────────┐   ┌─────────────────┐  │
//! │  │  pool  │──▶│ migrations │   │  repository/    │  │
//! │  │        │   └────────────┘   │   product       │  │
//! │  │Database│──────────────────▶ │   customer      │  │
//! │  └────────┘                    │   coupon        │  │
//! │                                │   loyalty       │  │
//! │                                │   order         │  │
//! │                                │   invoice       │  │
//! │                                │   sequence      │  │
//! │                                └─────────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Money lives as integer cents, timestamps as RFC 3339 TEXT, booleans
//! as 0/1. All guarded counters (stock, points, sequence values) are
//! advanced with conditional single-statement updates.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{
    CouponRepository, CustomerRepository, InvoiceRepository, InvoiceStats, LoyaltyRepository,
    OrderRepository, ProductRepository, SequenceRepository,
};
