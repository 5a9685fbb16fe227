//! Engine error type.
//!
//! Wraps core and database errors and adds the engine's own concerns:
//! permissions, configuration, rendering. The `is_*` helpers classify
//! errors into the four outcome groups an API layer maps onto status
//! codes, so that mapping lives in one place.

use mercato_core::{CoreError, CouponError, ValidationError};
use mercato_db::DbError;
use thiserror::Error;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Business rule violation from the core domain.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failure or storage-level conflict.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Caller lacks the role or ownership the operation requires.
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be read or parsed.
    #[error("Failed to load configuration: {0}")]
    ConfigLoadFailed(String),

    /// Configuration could not be written.
    #[error("Failed to save configuration: {0}")]
    ConfigSaveFailed(String),

    /// Document rendering failed.
    #[error("Document rendering failed: {0}")]
    RenderFailed(String),
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

impl From<CouponError> for EngineError {
    fn from(err: CouponError) -> Self {
        EngineError::Core(CoreError::Coupon(err))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for EngineError {
    fn from(err: toml::ser::Error) -> Self {
        EngineError::ConfigSaveFailed(err.to_string())
    }
}

impl EngineError {
    /// The referenced entity does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            EngineError::Core(core) => matches!(
                core,
                CoreError::ProductNotFound(_)
                    | CoreError::OrderNotFound(_)
                    | CoreError::CustomerNotFound(_)
                    | CoreError::InvoiceNotFound(_)
                    | CoreError::Coupon(CouponError::NotFound(_))
            ),
            EngineError::Db(DbError::NotFound { .. }) => true,
            _ => false,
        }
    }

    /// The input itself was malformed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::Core(
                CoreError::Validation(_)
                    | CoreError::InvalidStatus(_)
                    | CoreError::Coupon(CouponError::InvalidCode)
            )
        )
    }

    /// The input was fine but the current state refuses the operation.
    pub fn is_conflict(&self) -> bool {
        match self {
            EngineError::Core(core) => matches!(
                core,
                CoreError::InsufficientStock { .. }
                    | CoreError::InvalidOrderState { .. }
                    | CoreError::AlreadyCompleted(_)
                    | CoreError::AlreadyCancelled(_)
                    | CoreError::NoProofAttached(_)
                    | CoreError::OrderNotCompleted(_)
                    | CoreError::InvoiceAlreadyExists(_)
                    | CoreError::InvalidInvoiceStatus { .. }
                    | CoreError::BelowMinimumRedeem { .. }
                    | CoreError::InsufficientPoints { .. }
                    | CoreError::ZeroValueCoupon
                    | CoreError::Coupon(
                        CouponError::NotYetActive { .. }
                            | CouponError::Expired { .. }
                            | CouponError::Exhausted { .. }
                            | CouponError::BelowMinimum { .. }
                            | CouponError::UserLimitReached
                    )
            ),
            EngineError::Db(
                DbError::UniqueViolation { .. }
                    | DbError::InsufficientStock { .. }
                    | DbError::InsufficientPoints { .. },
            ) => true,
            _ => false,
        }
    }

    /// The caller is not allowed to do this at all.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, EngineError::Forbidden(_))
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use mercato_core::Money;

    #[test]
    fn test_not_found_classification() {
        let err: EngineError = CoreError::OrderNotFound("ord-1".to_string()).into();
        assert!(err.is_not_found());
        assert!(!err.is_conflict());

        let err: EngineError = CouponError::NotFound("SAVE10".to_string()).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_conflict_classification() {
        let err: EngineError = CoreError::InsufficientStock {
            name: "Mug".to_string(),
            available: 1,
            requested: 2,
        }
        .into();
        assert!(err.is_conflict());
        assert!(!err.is_validation());

        let err: EngineError = CouponError::BelowMinimum {
            min: Money::from_cents(2000),
        }
        .into();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_validation_classification() {
        let err: EngineError = ValidationError::Required {
            field: "items".to_string(),
        }
        .into();
        assert!(err.is_validation());
        assert!(!err.is_conflict());

        let err: EngineError = CouponError::InvalidCode.into();
        assert!(err.is_validation());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_forbidden_classification() {
        let err = EngineError::Forbidden("admin role required".to_string());
        assert!(err.is_forbidden());
        assert!(!err.is_validation());
    }
}
