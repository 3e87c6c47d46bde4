//! # Seed Data Generator
//!
//! Populates a fresh database with an admin account and a small shop
//! catalogue for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./duka_dev.db with admin / admin123
//! cargo run -p duka-db --bin seed
//!
//! # Specify database path and admin password
//! cargo run -p duka-db --bin seed -- --db ./data/duka.db --password s3cret
//! ```
//!
//! ## Generated Data
//! - An admin account
//! - Main categories with sub-categories (groceries, beverages, household)
//! - Products with opening stock, each recorded as a purchase so the
//!   history replays to the stored stock

use std::env;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use duka_core::{
    Capabilities, Money, NewMainCategory, NewProduct, NewPurchase, NewSubCategory, Role,
    DEFAULT_LOW_STOCK_THRESHOLD,
};
use duka_db::password::hash_password;
use duka_db::{Database, DbConfig, NewUserRecord};

/// (main category, sub-category, [(code, name, price, cost, opening stock)])
type Catalogue = &'static [(&'static str, &'static str, &'static [(&'static str, &'static str, i64, i64, i64)])];

const CATALOGUE: Catalogue = &[
    (
        "Groceries",
        "Dry goods",
        &[
            ("GRO-001", "Sugar 1kg", 180, 150, 40),
            ("GRO-002", "Maize flour 2kg", 210, 175, 60),
            ("GRO-003", "Rice 5kg", 950, 800, 12),
            ("GRO-004", "Salt 500g", 40, 28, 8),
        ],
    ),
    (
        "Groceries",
        "Cooking oil",
        &[
            ("GRO-101", "Vegetable oil 1L", 390, 330, 25),
            ("GRO-102", "Vegetable oil 5L", 1750, 1500, 6),
        ],
    ),
    (
        "Beverages",
        "Soft drinks",
        &[
            ("BEV-001", "Soda 500ml", 70, 50, 96),
            ("BEV-002", "Soda 2L", 200, 160, 24),
        ],
    ),
    (
        "Beverages",
        "Tea & coffee",
        &[
            ("BEV-101", "Tea leaves 250g", 160, 120, 30),
            ("BEV-102", "Instant coffee 100g", 450, 380, 0),
        ],
    ),
    (
        "Household",
        "Cleaning",
        &[
            ("HSE-001", "Bar soap", 120, 90, 50),
            ("HSE-002", "Washing powder 1kg", 330, 270, 15),
        ],
    ),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./duka_dev.db");
    let mut username = String::from("admin");
    let mut password = String::from("admin123");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--username" | "-u" => {
                if i + 1 < args.len() {
                    username = args[i + 1].clone();
                    i += 1;
                }
            }
            "--password" | "-p" => {
                if i + 1 < args.len() {
                    password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("DukaSmart Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>          Database file path (default: ./duka_dev.db)");
                println!("  -u, --username <NAME>    Admin username (default: admin)");
                println!("  -p, --password <PASS>    Admin password (default: admin123)");
                println!("  -h, --help               Show this help message");
                return Ok(());
            }
            other => {
                eprintln!("Ignoring unknown argument: {}", other);
            }
        }
        i += 1;
    }

    println!("🌱 DukaSmart Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {}", db_path))?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.users().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} users", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let admin = db
        .users()
        .create(
            NewUserRecord {
                username: username.clone(),
                full_name: "Shop Owner".to_string(),
                email: None,
                password_hash: hash_password(&password)?,
                role: Role::Admin,
                permissions: Capabilities::empty(),
            },
            None,
        )
        .await
        .context("creating admin account")?;
    println!("✓ Admin account: {} / {}", username, password);

    let categories = db.categories();
    let mut products = 0;
    let mut units = 0;

    for (main_name, sub_name, items) in CATALOGUE {
        let main = match categories.find_main_by_name(main_name).await? {
            Some(m) => m,
            None => {
                categories
                    .create_main(
                        NewMainCategory {
                            name: main_name.to_string(),
                            description: None,
                        }
                        .validate()?,
                        &admin,
                    )
                    .await?
            }
        };

        let sub = categories
            .create_sub(
                NewSubCategory {
                    main_category_id: main.id.clone(),
                    name: sub_name.to_string(),
                    description: None,
                }
                .validate()?,
                &admin,
            )
            .await?;

        for (code, name, price, cost, opening) in items.iter() {
            let product = db
                .products()
                .create(
                    NewProduct {
                        code: code.to_string(),
                        name: name.to_string(),
                        description: None,
                        sub_category_id: sub.id.clone(),
                        price: Money::from_major_minor(*price, 0),
                        low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
                    }
                    .validate()?,
                    &admin,
                )
                .await
                .with_context(|| format!("creating product {}", code))?;
            products += 1;

            if *opening > 0 {
                db.purchases()
                    .create(
                        NewPurchase {
                            product_id: product.id.clone(),
                            quantity: *opening,
                            cost_per_unit: Money::from_major_minor(*cost, 0),
                            supplier_name: Some("Opening stock".to_string()),
                        }
                        .validate()?,
                        &admin,
                    )
                    .await?;
                units += opening;
            }
        }

        println!("  {} / {}: {} products", main_name, sub_name, items.len());
    }

    // The opening purchases fill the feed; start with it read.
    db.notifications().mark_all_read().await?;

    println!();
    println!("✓ Created {} products with {} units of opening stock", products, units);
    println!("✓ Seed complete!");

    Ok(())
}
