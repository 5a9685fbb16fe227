//! Development data seeder.
//!
//! Populates a database with a demo catalog, a pair of coupons and a
//! customer with a stored billing profile. Refuses to run against a
//! database that already has products.
//!
//! Usage:
//!   cargo run --bin seed -- --db ./mercato.db

use chrono::Utc;
use mercato_core::{Coupon, Customer, DiscountKind, Product};
use mercato_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const CATALOG: &[(&str, &str, i64, i64)] = &[
    ("Espresso Beans 1kg", "coffee", 1850, 40),
    ("Filter Coffee 500g", "coffee", 950, 60),
    ("Ceramic Mug", "accessories", 1250, 80),
    ("Travel Tumbler", "accessories", 2200, 35),
    ("Pour-over Kettle", "equipment", 4500, 12),
    ("Hand Grinder", "equipment", 3800, 20),
    ("Cold Brew Bottle", "equipment", 2750, 18),
    ("Sampler Box", "gifts", 3200, 25),
    ("Gift Card Sleeve", "gifts", 300, 200),
    ("Loose Leaf Tea 250g", "tea", 1100, 45),
    ("Matcha Whisk", "tea", 1600, 15),
    ("Honey Jar 340g", "pantry", 780, 50),
];

fn print_help() {
    println!("Seed the Mercato database with demo data");
    println!();
    println!("Options:");
    println!("  --db <path>   Database file (default: ./mercato.db)");
    println!("  --help        Show this help");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,mercato=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut db_path = String::from("./mercato.db");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--db" => {
                i += 1;
                db_path = args.get(i).cloned().ok_or("--db requires a path")?;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let started = std::time::Instant::now();
    println!("Opening database at {db_path} ...");
    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {existing} products, nothing to do.");
        return Ok(());
    }

    let now = Utc::now();
    let products = db.products();
    for (name, category, price_cents, stock) in CATALOG {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            category: Some(category.to_string()),
            price_cents: *price_cents,
            stock: *stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        products.insert(&product).await?;
    }
    println!("✓ Seeded {} products", CATALOG.len());

    let coupons = db.coupons();
    coupons
        .insert(&Coupon {
            id: Uuid::new_v4().to_string(),
            code: "SAVE10".to_string(),
            kind: DiscountKind::Percentage,
            value: 10,
            max_discount_cents: Some(500),
            min_purchase_cents: Some(2000),
            starts_at: None,
            ends_at: None,
            usage_limit: 0,
            per_user_limit: 0,
            times_used: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await?;
    coupons
        .insert(&Coupon {
            id: Uuid::new_v4().to_string(),
            code: "WELCOME5".to_string(),
            kind: DiscountKind::FixedAmount,
            value: 500,
            max_discount_cents: None,
            min_purchase_cents: None,
            starts_at: None,
            ends_at: None,
            usage_limit: 0,
            per_user_limit: 1,
            times_used: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await?;
    println!("✓ Seeded 2 coupons (SAVE10, WELCOME5)");

    db.customers()
        .insert(&Customer {
            id: Uuid::new_v4().to_string(),
            user_id: Some("demo-user".to_string()),
            name: "Dana Reyes".to_string(),
            email: Some("dana@example.com".to_string()),
            phone: Some("555-0101".to_string()),
            billing_name: Some("Reyes Consulting".to_string()),
            billing_tax_id: Some("REYD850101AB1".to_string()),
            billing_address: Some("12 Harbor Rd, Puerto Viejo".to_string()),
            billing_email: Some("billing@reyes.example".to_string()),
            billing_phone: None,
            created_at: now,
            updated_at: now,
        })
        .await?;
    println!("✓ Seeded 1 customer (demo-user)");

    let elapsed = started.elapsed();
    println!();
    println!("Done in {:.2}s", elapsed.as_secs_f64());
    db.close().await;
    Ok(())
}
