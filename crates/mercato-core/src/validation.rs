//! Input validation helpers.
//!
//! Free functions that check one field each and return a typed
//! [`ValidationError`]. Services run these before touching storage so
//! malformed input never reaches a transaction.

use uuid::Uuid;

use crate::coupon::DiscountKind;
use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_NAME_LENGTH, MAX_ORDER_ITEMS, MAX_PRICE_CENTS};

/// Result type for validation functions.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a product or snapshot name: non-empty after trimming, within
/// length bounds. Returns the trimmed value.
pub fn validate_name(name: &str) -> ValidationResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(trimmed.to_string())
}

/// Validates a line item quantity: strictly positive, capped.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if quantity > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a price in cents: non-negative, within the sane cap.
pub fn validate_price_cents(price_cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&price_cents) {
        return Err(ValidationError::OutOfRange {
            field: "price_cents".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Validates a manual discount: zero is fine, negative is not.
pub fn validate_discount_cents(discount_cents: i64) -> ValidationResult<()> {
    if discount_cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "discount_cents".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Validates a coupon's value for its kind: percentages are 1-100,
/// fixed amounts are positive cents.
pub fn validate_coupon_value(kind: DiscountKind, value: i64) -> ValidationResult<()> {
    match kind {
        DiscountKind::Percentage => {
            if !(1..=100).contains(&value) {
                return Err(ValidationError::OutOfRange {
                    field: "value".to_string(),
                    min: 1,
                    max: 100,
                });
            }
        }
        DiscountKind::FixedAmount => {
            if value <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "value".to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Validates the number of lines on an order.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }
    if count > MAX_ORDER_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_ITEMS as i64,
        });
    }
    Ok(())
}

/// Validates a human-entered reason (cancellation, void). Returns the
/// trimmed value.
pub fn validate_reason(reason: &str) -> ValidationResult<String> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Validates that a string is a well-formed UUID.
pub fn validate_uuid(field: &str, value: &str) -> ValidationResult<()> {
    Uuid::parse_str(value).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "not a valid UUID".to_string(),
    })?;
    Ok(())
}
