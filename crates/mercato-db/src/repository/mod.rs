//! Repository pattern implementations.
//!
//! One repository per aggregate. Each holds a pool clone and exposes
//! async methods returning `DbResult`. Multi-step writes (order
//! creation, proof rejection, point redemption) run inside a single
//! transaction owned by the repository method.
//!
//! Helpers suffixed `_with` take `&mut SqliteConnection` so the same SQL
//! runs identically from a pooled connection or inside another
//! repository's transaction.

mod coupon;
mod customer;
mod invoice;
mod loyalty;
mod order;
mod product;
mod sequence;

pub use coupon::CouponRepository;
pub use customer::CustomerRepository;
pub use invoice::{InvoiceRepository, InvoiceStats};
pub use loyalty::LoyaltyRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;
pub use sequence::SequenceRepository;
