//! Product catalog management.
//!
//! Admins maintain the catalog; storefront callers read the active slice
//! of it. Stock and price mutations here never touch open orders, which
//! carry their own price snapshots.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use mercato_core::{
    validation::{validate_name, validate_price_cents},
    CoreError, Product, ValidationError,
};

use crate::audit::{AuditAction, AuditEvent};
use crate::commerce::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::principal::Principal;

/// Input for a new catalog product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category: Option<String>,
    pub price_cents: i64,
    pub stock: i64,
}

/// Partial update; unset fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price_cents: Option<i64>,
    pub stock: Option<i64>,
    pub is_active: Option<bool>,
}

/// Catalog reads and admin maintenance.
pub struct CatalogService {
    ctx: EngineContext,
}

impl CatalogService {
    pub(crate) fn new(ctx: EngineContext) -> Self {
        CatalogService { ctx }
    }

    /// Adds a product to the catalog. Admin only.
    pub async fn create(&self, principal: &Principal, input: NewProduct) -> EngineResult<Product> {
        principal.require_admin()?;

        let name = validate_name(&input.name)?;
        validate_price_cents(input.price_cents)?;
        if input.stock < 0 {
            return Err(ValidationError::MustBePositive {
                field: "stock".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name,
            category: input.category,
            price_cents: input.price_cents,
            stock: input.stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.ctx.db.products().insert(&product).await?;

        info!(product_id = %product.id, name = %product.name, "product created");
        self.ctx.audit.record(AuditEvent::new(
            &principal.id,
            AuditAction::ProductCreated,
            &product.id,
            &product.name,
        ));

        Ok(product)
    }

    /// Applies a partial update to a product. Admin only.
    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        update: ProductUpdate,
    ) -> EngineResult<Product> {
        principal.require_admin()?;

        let mut product = self
            .ctx
            .db
            .products()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

        if let Some(name) = update.name {
            product.name = validate_name(&name)?;
        }
        if let Some(category) = update.category {
            product.category = Some(category);
        }
        if let Some(price_cents) = update.price_cents {
            validate_price_cents(price_cents)?;
            product.price_cents = price_cents;
        }
        if let Some(stock) = update.stock {
            if stock < 0 {
                return Err(ValidationError::MustBePositive {
                    field: "stock".to_string(),
                }
                .into());
            }
            product.stock = stock;
        }
        if let Some(is_active) = update.is_active {
            product.is_active = is_active;
        }
        product.updated_at = Utc::now();

        self.ctx.db.products().update(&product).await?;

        self.ctx.audit.record(AuditEvent::new(
            &principal.id,
            AuditAction::ProductUpdated,
            &product.id,
            &product.name,
        ));

        Ok(product)
    }

    /// Removes a product from sale without deleting its history. Admin only.
    pub async fn deactivate(&self, principal: &Principal, id: &str) -> EngineResult<()> {
        principal.require_admin()?;

        self.ctx.db.products().deactivate(id).await?;

        self.ctx.audit.record(AuditEvent::new(
            &principal.id,
            AuditAction::ProductUpdated,
            id,
            "deactivated",
        ));

        Ok(())
    }

    /// One product. Customers only see active products; admins see all.
    pub async fn get(&self, principal: &Principal, id: &str) -> EngineResult<Product> {
        let product = self
            .ctx
            .db
            .products()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

        if !product.is_active && !principal.is_admin() {
            return Err(EngineError::Core(CoreError::ProductNotFound(id.to_string())));
        }

        Ok(product)
    }

    /// Active products, as the storefront sees them.
    pub async fn list(&self, limit: i64) -> EngineResult<Vec<Product>> {
        Ok(self.ctx.db.products().list_active(limit).await?)
    }

    /// Every product, deactivated included. Admin only.
    pub async fn list_all(&self, principal: &Principal, limit: i64) -> EngineResult<Vec<Product>> {
        principal.require_admin()?;
        Ok(self.ctx.db.products().list_all(limit).await?)
    }
}
