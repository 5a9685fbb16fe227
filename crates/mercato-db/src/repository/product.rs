//! Product repository: catalog rows and the guarded stock counters.

use chrono::Utc;
use mercato_core::Product;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, category, price_cents, stock, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(product_id = %product.id, name = %product.name, "product inserted");
        Ok(())
    }

    /// Fetches a product by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, category, price_cents, stock, is_active, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    /// Lists active products, newest first.
    pub async fn list_active(&self, limit: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, category, price_cents, stock, is_active, created_at, updated_at
            FROM products
            WHERE is_active = 1
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Lists every product including deactivated ones.
    pub async fn list_all(&self, limit: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, category, price_cents, stock, is_active, created_at, updated_at
            FROM products
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Updates name, category, price, stock and active flag.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = ?2, category = ?3, price_cents = ?4, stock = ?5, is_active = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }
        Ok(())
    }

    /// Soft-deletes a product so it stops selling but keeps history.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Reserves stock for one line, failing if not enough is on hand.
    pub async fn reserve_stock(&self, id: &str, quantity: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        reserve_stock_with(&mut conn, id, quantity).await
    }

    /// Returns previously reserved stock.
    pub async fn release_stock(&self, id: &str, quantity: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        release_stock_with(&mut conn, id, quantity).await
    }

    /// Total number of products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Conditional decrement: only succeeds while enough stock remains.
///
/// A zero-row update is disambiguated with a follow-up read so callers
/// get either NotFound or InsufficientStock with the current count.
pub(crate) async fn reserve_stock_with(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND is_active = 1 AND stock >= ?2
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1 AND is_active = 1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        return Err(match stock {
            Some(available) => DbError::InsufficientStock {
                product_id: id.to_string(),
                available,
                requested: quantity,
            },
            None => DbError::not_found("Product", id),
        });
    }

    debug!(product_id = %id, quantity, "stock reserved");
    Ok(())
}

/// Unconditional increment used by cancellation paths.
pub(crate) async fn release_stock_with(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    debug!(product_id = %id, quantity, "stock released");
    Ok(())
}
