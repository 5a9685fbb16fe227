//! Document numbering for orders and invoices.
//!
//! Both formats are `PREFIX-YYYYMMDD-NNNNN` with the counter zero-padded
//! to five digits. Order numbers draw from one global counter, so the
//! date stamp and the counter move independently; invoice counters reset
//! each day via a date-scoped sequence key.

use chrono::NaiveDate;

/// Sequence key for the global order counter.
pub const ORDER_SEQUENCE: &str = "order";

/// Formats an order number: `ORD-YYYYMMDD-NNNNN`.
///
/// ## Example
///
/// ```
/// use chrono::NaiveDate;
/// use mercato_core::numbering::order_number;
///
/// let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
/// assert_eq!(order_number(date, 1), "ORD-20240501-00001");
/// ```
pub fn order_number(date: NaiveDate, seq: i64) -> String {
    format!("ORD-{}-{:05}", date.format("%Y%m%d"), seq)
}

/// Formats an invoice number: `INV-YYYYMMDD-NNNNN`.
pub fn invoice_number(date: NaiveDate, seq: i64) -> String {
    format!("INV-{}-{:05}", date.format("%Y%m%d"), seq)
}

/// Sequence key for a day's invoice counter, e.g. `invoice:20240501`.
pub fn invoice_sequence_key(date: NaiveDate) -> String {
    format!("invoice:{}", date.format("%Y%m%d"))
}
