//! Database error types.
//!
//! Wraps sqlx errors into a stable taxonomy the service layer can match
//! on. Constraint violations are parsed out of SQLite's message text so
//! callers see `UniqueViolation` instead of a raw driver error, and the
//! two guarded counters (stock, points) get dedicated conflict variants.

use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found by id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    #[error("Duplicate value for {field}: {value}")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Referenced entity does not exist: {message}")]
    ForeignKeyViolation { message: String },

    /// Guarded stock decrement found fewer units than requested.
    ///
    /// Raised by the conditional `stock >= ?` update, which is the
    /// authoritative oversell check under concurrency.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Guarded point debit found a balance below the requested spend.
    #[error("Insufficient points for user {user_id}: available {available}, requested {requested}")]
    InsufficientPoints {
        user_id: String,
        available: i64,
        requested: i64,
    },

    /// Could not open or connect to the database.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed to apply.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction could not be committed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Connection pool exhausted.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Anything else.
    #[error("Database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for an entity type and id.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error for a field and value.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if msg.contains("UNIQUE constraint failed") {
                    // Message format: "UNIQUE constraint failed: table.column"
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: String::new(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_constructor() {
        let err = DbError::not_found("Order", "ord-123");
        assert_eq!(err.to_string(), "Order not found: ord-123");
    }

    #[test]
    fn test_duplicate_constructor() {
        let err = DbError::duplicate("code", "SAVE10");
        assert_eq!(err.to_string(), "Duplicate value for code: SAVE10");
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = DbError::InsufficientStock {
            product_id: "p1".to_string(),
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product p1: available 2, requested 5"
        );
    }
}
