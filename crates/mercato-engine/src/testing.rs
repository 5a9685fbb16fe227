//! Shared fixtures for service tests: an in-memory engine, a seeded
//! product, and the standard checkout request.

use chrono::Utc;
use uuid::Uuid;

use mercato_core::Product;
use mercato_db::Database;

use crate::commerce::Commerce;
use crate::config::CommerceConfig;
use crate::orders::{NewCustomer, OrderLine, OrderRequest, OrderView};
use crate::principal::Principal;

pub(crate) async fn test_commerce() -> Commerce {
    let db = Database::in_memory().await.unwrap();
    Commerce::new(db, CommerceConfig::default())
}

pub(crate) async fn seed_product(
    commerce: &Commerce,
    name: &str,
    price_cents: i64,
    stock: i64,
) -> Product {
    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        category: None,
        price_cents,
        stock,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    commerce.db().products().insert(&product).await.unwrap();
    product
}

/// A single-line cash order that will create a customer record for the
/// calling principal on first use.
pub(crate) fn request_for(product: &Product, quantity: i64) -> OrderRequest {
    OrderRequest {
        customer: Some(NewCustomer {
            name: "Dana Reyes".to_string(),
            email: Some("dana@example.com".to_string()),
            phone: None,
        }),
        items: vec![OrderLine {
            product_id: product.id.clone(),
            quantity,
        }],
        ..OrderRequest::default()
    }
}

/// Walks an order through `processing` into `completed`.
pub(crate) async fn complete_order(
    commerce: &Commerce,
    admin: &Principal,
    order_id: &str,
) -> OrderView {
    commerce
        .orders()
        .update_status(admin, order_id, "processing")
        .await
        .unwrap();
    commerce
        .orders()
        .update_status(admin, order_id, "completed")
        .await
        .unwrap()
}
