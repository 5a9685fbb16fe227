//! Customer repository.

use chrono::Utc;
use mercato_core::{Customer, FiscalData};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

const CUSTOMER_COLUMNS: &str = "id, user_id, name, email, phone, billing_name, billing_tax_id, \
     billing_address, billing_email, billing_phone, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a new customer. Fails on a duplicate user link.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, user_id, name, email, phone, billing_name, billing_tax_id,
                                   billing_address, billing_email, billing_phone, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.user_id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.billing_name)
        .bind(&customer.billing_tax_id)
        .bind(&customer.billing_address)
        .bind(&customer.billing_email)
        .bind(&customer.billing_phone)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(customer_id = %customer.id, "customer inserted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    /// Finds the customer record linked to an authenticated user.
    pub async fn get_by_user_id(&self, user_id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE user_id = ?1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    /// Replaces the stored billing profile.
    pub async fn update_billing(&self, id: &str, billing: &FiscalData) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET billing_name = ?2, billing_tax_id = ?3, billing_address = ?4,
                billing_email = ?5, billing_phone = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&billing.name)
        .bind(&billing.tax_id)
        .bind(&billing.address)
        .bind(&billing.email)
        .bind(&billing.phone)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;
    use uuid::Uuid;

    fn sample_customer(user_id: Option<&str>) -> Customer {
        let now = Utc::now();
        Customer {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.map(str::to_string),
            name: "Dana Reyes".to_string(),
            email: Some("dana@example.com".to_string()),
            phone: None,
            billing_name: None,
            billing_tax_id: None,
            billing_address: None,
            billing_email: None,
            billing_phone: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.customers();

        let customer = sample_customer(Some("user-1"));
        repo.insert(&customer).await.unwrap();

        let by_id = repo.get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "Dana Reyes");

        let by_user = repo.get_by_user_id("user-1").await.unwrap().unwrap();
        assert_eq!(by_user.id, customer.id);

        assert!(repo.get_by_user_id("user-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_user_link_rejected() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.customers();

        repo.insert(&sample_customer(Some("user-1"))).await.unwrap();
        let err = repo.insert(&sample_customer(Some("user-1"))).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_billing() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.customers();

        let customer = sample_customer(None);
        repo.insert(&customer).await.unwrap();

        let billing = FiscalData {
            name: Some("Reyes Consulting".to_string()),
            tax_id: Some("REYD850101".to_string()),
            address: Some("12 Harbor Rd".to_string()),
            email: None,
            phone: None,
        };
        repo.update_billing(&customer.id, &billing).await.unwrap();

        let found = repo.get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(found.billing_name.as_deref(), Some("Reyes Consulting"));
        assert!(found.billing_profile().is_complete());

        let err = repo.update_billing("missing", &billing).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
