//! # Sale Repository
//!
//! Records sales and takes their quantity out of stock.
//!
//! ## Transaction
//! ```text
//! BEGIN
//!   stock::adjust(-quantity)          refused if stock < quantity
//!   INSERT INTO sales                 price defaults to product.price
//!   INSERT OR IGNORE INTO customers
//!   publish SaleRecorded              new_sale
//!   publish StockLevelChanged         low_stock / out_of_stock on crossing
//!   audit sale.create
//! COMMIT
//! ```
//!
//! An insufficient-stock rejection drops the transaction before anything
//! is written, so no sale, notification or audit row exists for it.

use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info};

use duka_core::{DomainEvent, NewAuditLog, NewSale, Sale, SaleListing, User, ValidationError};

use crate::error::{DbError, DbResult};
use crate::repository::notification::EventPublisher;
use crate::repository::{audit, begin_write, customer, generate_id, stock};

const LISTING_SELECT: &str = r#"
    SELECT
        s.id, s.product_id, p.code AS product_code, p.name AS product_name,
        s.quantity, s.sale_price, s.total_amount, s.customer_name,
        s.sold_by, u.full_name AS sold_by_name, s.created_at
    FROM sales s
    JOIN products p ON p.id = s.product_id
    JOIN users u ON u.id = s.sold_by
"#;

/// Repository for sales.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a sale.
    ///
    /// ## Errors
    /// - `NotFound` if the product doesn't exist
    /// - `InsufficientStock` if fewer than `quantity` units are on hand
    pub async fn create(&self, input: NewSale, actor: &User) -> DbResult<Sale> {
        debug!(product_id = %input.product_id, quantity = input.quantity, "Recording sale");

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        // The stock write comes first so this transaction holds the write
        // lock before it reads anything.
        let change = stock::adjust(&mut tx, &input.product_id, -input.quantity, now).await?;

        let sale_price = input.sale_price.unwrap_or(change.product.price);
        let total_amount = sale_price.multiply_quantity(input.quantity).ok_or_else(|| {
            DbError::Invalid(
                ValidationError::OutOfRange {
                    field: "salePrice".to_string(),
                    min: 0,
                    max: i64::MAX,
                }
                .into(),
            )
        })?;

        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (
                id, product_id, quantity, sale_price, total_amount,
                customer_name, sold_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING *
            "#,
        )
        .bind(generate_id())
        .bind(&input.product_id)
        .bind(input.quantity)
        .bind(sale_price)
        .bind(total_amount)
        .bind(&input.customer_name)
        .bind(&actor.id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(name) = sale.customer_name.as_deref() {
            customer::remember(&mut tx, name, now).await?;
        }

        tx.publish(&DomainEvent::SaleRecorded {
            product_id: change.product.id.clone(),
            product_name: change.product.name.clone(),
            quantity: sale.quantity,
            total_amount: sale.total_amount,
            sold_by: actor.full_name.clone(),
        })
        .await?;
        tx.publish(&change.level_event()).await?;

        audit::record(
            &mut tx,
            NewAuditLog::new(&actor.id, "sale.create", "sale")
                .entity(&sale.id)
                .details(
                    json!({
                        "productCode": change.product.code,
                        "quantity": sale.quantity,
                        "totalAmount": sale.total_amount,
                        "stockBefore": change.before,
                        "stockAfter": change.after(),
                    })
                    .to_string(),
                ),
        )
        .await?;

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            code = %change.product.code,
            quantity = sale.quantity,
            stock = change.after(),
            "Sale recorded"
        );
        Ok(sale)
    }

    /// Newest first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<SaleListing>> {
        let sql = format!(
            "{} ORDER BY s.created_at DESC, s.rowid DESC LIMIT ?1",
            LISTING_SELECT
        );

        let sales = sqlx::query_as::<_, SaleListing>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Sales of the last 24 hours, newest first.
    pub async fn recent(&self, limit: i64) -> DbResult<Vec<SaleListing>> {
        let sql = format!(
            "{} WHERE s.created_at >= ?1 ORDER BY s.created_at DESC, s.rowid DESC LIMIT ?2",
            LISTING_SELECT
        );

        let sales = sqlx::query_as::<_, SaleListing>(&sql)
            .bind(Utc::now() - Duration::hours(24))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::test_support;
    use duka_core::{Money, NewProduct, NewPurchase, NotificationKind, NotificationAction, Product};

    async fn stock_up(db: &Database, actor: &User, product: &Product, quantity: i64) {
        db.purchases()
            .create(
                NewPurchase {
                    product_id: product.id.clone(),
                    quantity,
                    cost_per_unit: Money::from_major_minor(300, 0),
                    supplier_name: None,
                },
                actor,
            )
            .await
            .unwrap();
    }

    fn sell(product: &Product, quantity: i64) -> NewSale {
        NewSale {
            product_id: product.id.clone(),
            quantity,
            sale_price: None,
            customer_name: None,
        }
    }

    #[tokio::test]
    async fn test_sale_defaults_to_product_price() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let product = test_support::product(&db, &admin, "SUG-1", 2).await;
        stock_up(&db, &admin, &product, 12).await;

        let sale = db.sales().create(sell(&product, 5), &admin).await.unwrap();

        assert_eq!(sale.sale_price, Money::from_major_minor(500, 0));
        assert_eq!(sale.total_amount, Money::from_major_minor(2500, 0));
        assert_eq!(db.products().get(&product.id).await.unwrap().stock_quantity, 7);

        let listed = db.sales().list(10).await.unwrap();
        assert_eq!(listed[0].sold_by_name, admin.full_name);
        assert_eq!(db.sales().recent(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_sale_changes_nothing() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let product = test_support::product(&db, &admin, "SUG-1", 2).await;
        stock_up(&db, &admin, &product, 3).await;
        let notifications_before = db.notifications().list(false, 100).await.unwrap().len();
        let audit_before = db.audit_logs().list(100).await.unwrap().len();

        let err = db.sales().create(sell(&product, 4), &admin).await.unwrap_err();

        assert!(matches!(
            err,
            DbError::InsufficientStock {
                ref code,
                available: 3,
                requested: 4,
            } if code == "SUG-1"
        ));
        assert_eq!(db.products().get(&product.id).await.unwrap().stock_quantity, 3);
        assert!(db.sales().list(10).await.unwrap().is_empty());
        assert_eq!(
            db.notifications().list(false, 100).await.unwrap().len(),
            notifications_before
        );
        assert_eq!(db.audit_logs().list(100).await.unwrap().len(), audit_before);
    }

    #[tokio::test]
    async fn test_crossing_threshold_notifies_once() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let product = test_support::product(&db, &admin, "SUG-1", 5).await;
        stock_up(&db, &admin, &product, 7).await;
        db.notifications().mark_all_read().await.unwrap();

        // 7 → 4 crosses the threshold of 5
        db.sales().create(sell(&product, 3), &admin).await.unwrap();
        // 4 → 2 stays below it
        db.sales().create(sell(&product, 2), &admin).await.unwrap();
        // 2 → 0 runs out
        db.sales()
            .create(
                NewSale {
                    customer_name: Some("Achieng".to_string()),
                    ..sell(&product, 2)
                },
                &admin,
            )
            .await
            .unwrap();

        let kinds: Vec<NotificationKind> = db
            .notifications()
            .list(true, 100)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                NotificationKind::OutOfStock,
                NotificationKind::NewSale,
                NotificationKind::NewSale,
                NotificationKind::LowStock,
                NotificationKind::NewSale,
            ]
        );

        let low = db.notifications().list(true, 100).await.unwrap();
        assert_eq!(low[0].action, Some(NotificationAction::Restock));
        assert_eq!(low[0].product_id.as_deref(), Some(product.id.as_str()));
        assert_eq!(db.customers().list().await.unwrap()[0].name, "Achieng");
    }

    #[tokio::test]
    async fn test_custom_price() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let product = test_support::product(&db, &admin, "SUG-1", 0).await;
        stock_up(&db, &admin, &product, 10).await;

        let sale = db
            .sales()
            .create(
                NewSale {
                    sale_price: Some(Money::from_major_minor(450, 0)),
                    ..sell(&product, 2)
                },
                &admin,
            )
            .await
            .unwrap();
        assert_eq!(sale.total_amount, Money::from_major_minor(900, 0));
    }

    /// Several connections against one file so writers really race.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_never_oversell() {
        let path = std::env::temp_dir().join(format!("duka-race-{}.db", generate_id()));
        let db = Database::new(DbConfig::new(&path).max_connections(8))
            .await
            .unwrap();
        let admin = test_support::admin(&db).await;
        let product = test_support::product(&db, &admin, "RACE", 0).await;
        stock_up(&db, &admin, &product, 4).await;

        // Two sales of 3 against 4 units: exactly one may win.
        let mut handles = Vec::new();
        for _ in 0..2 {
            let db = db.clone();
            let admin = admin.clone();
            let input = sell(&product, 3);
            handles.push(tokio::spawn(async move { db.sales().create(input, &admin).await }));
        }

        let mut won = 0;
        let mut refused = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => won += 1,
                Err(DbError::InsufficientStock { available: 1, .. }) => refused += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!((won, refused), (1, 1));

        // Ten single-unit sales against the one remaining unit.
        let mut handles = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            let admin = admin.clone();
            let input = sell(&product, 1);
            handles.push(tokio::spawn(async move { db.sales().create(input, &admin).await }));
        }
        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);

        let stored = db.products().get(&product.id).await.unwrap().stock_quantity;
        assert_eq!(stored, 0);
        assert_eq!(db.products().replay_stock(&product.id).await.unwrap(), stored);

        db.close().await;
        remove_db_files(&path);
    }

    /// Admin writes that read before writing must wait for the lock held
    /// by concurrent sales, not fail with "database is locked".
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_catalogue_writes_alongside_sales() {
        let path = std::env::temp_dir().join(format!("duka-mixed-{}.db", generate_id()));
        let db = Database::new(DbConfig::new(&path).max_connections(8))
            .await
            .unwrap();
        let admin = test_support::admin(&db).await;
        let product = test_support::product(&db, &admin, "BUSY", 0).await;
        stock_up(&db, &admin, &product, 100).await;

        let mut handles = Vec::new();
        for i in 0..40 {
            let db = db.clone();
            let admin = admin.clone();
            let sale = sell(&product, 1);
            let new_product = NewProduct {
                code: format!("C-{i}"),
                name: format!("Concurrent {i}"),
                description: None,
                sub_category_id: product.sub_category_id.clone(),
                price: Money::from_major_minor(100, 0),
                low_stock_threshold: 0,
            };
            handles.push(tokio::spawn(async move {
                let sold = db.sales().create(sale, &admin).await.map(|_| ());
                let created = db.products().create(new_product, &admin).await.map(|_| ());
                sold.and(created)
            }));
        }
        for handle in handles {
            if let Err(e) = handle.await.unwrap() {
                panic!("write failed under contention: {e}");
            }
        }

        assert_eq!(db.products().count().await.unwrap(), 41);
        assert_eq!(db.products().get(&product.id).await.unwrap().stock_quantity, 60);

        db.close().await;
        remove_db_files(&path);
    }

    fn remove_db_files(path: &std::path::Path) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.as_os_str().to_owned();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}
