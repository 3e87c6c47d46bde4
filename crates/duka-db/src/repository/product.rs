//! # Product Repository
//!
//! Product catalogue CRUD. Stock is never written here: new products start
//! at zero and only the purchase, sale and stock-movement transactions
//! change `stock_quantity` (see [`stock`](super::stock)).
//!
//! ## Stock Replay
//! ```text
//! stored stock_quantity
//!     == Σ purchases.quantity
//!      − Σ sales.quantity
//!      + Σ movements.quantity (in)
//!      − Σ movements.quantity (out)
//! ```
//! [`ProductRepository::replay_stock`] recomputes the right-hand side from
//! the immutable history.

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info};

use duka_core::{NewAuditLog, NewProduct, Product, ProductListing, UpdateProduct, User};

use crate::error::{DbError, DbResult};
use crate::repository::audit;
use crate::repository::{begin_write, generate_id};

/// Product row joined with its category names.
const LISTING_SELECT: &str = r#"
    SELECT
        p.id, p.code, p.name, p.description, p.sub_category_id,
        s.name AS sub_category_name,
        m.id AS main_category_id,
        m.name AS main_category_name,
        p.price, p.stock_quantity, p.low_stock_threshold,
        p.created_at, p.updated_at
    FROM products p
    JOIN sub_categories s ON s.id = p.sub_category_id
    JOIN main_categories m ON m.id = s.main_category_id
"#;

/// Filters for [`ProductRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub sub_category_id: Option<String>,
    pub main_category_id: Option<String>,
    pub limit: i64,
}

/// Repository for products.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Products by name, optionally narrowed to one category.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<ProductListing>> {
        let sql = format!(
            "{} WHERE (?1 IS NULL OR p.sub_category_id = ?1)
                 AND (?2 IS NULL OR m.id = ?2)
               ORDER BY p.name COLLATE NOCASE
               LIMIT ?3",
            LISTING_SELECT
        );

        let products = sqlx::query_as::<_, ProductListing>(&sql)
            .bind(&filter.sub_category_id)
            .bind(&filter.main_category_id)
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Products at or below their threshold, emptiest first.
    pub async fn list_low_stock(&self) -> DbResult<Vec<ProductListing>> {
        let sql = format!(
            "{} WHERE p.stock_quantity <= p.low_stock_threshold
               ORDER BY p.stock_quantity, p.name COLLATE NOCASE",
            LISTING_SELECT
        );

        let products = sqlx::query_as::<_, ProductListing>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    pub async fn get(&self, id: &str) -> DbResult<Product> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    pub async fn get_listing(&self, id: &str) -> DbResult<ProductListing> {
        let sql = format!("{} WHERE p.id = ?1", LISTING_SELECT);

        sqlx::query_as::<_, ProductListing>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Case-insensitive lookup by code.
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE code = ?1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Creates a product with zero stock.
    ///
    /// ## Errors
    /// - `NotFound` if the sub-category doesn't exist
    /// - `UniqueViolation { field: "code" }` for a duplicate code
    pub async fn create(&self, input: NewProduct, actor: &User) -> DbResult<Product> {
        debug!(code = %input.code, "Creating product");

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let sub_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM sub_categories WHERE id = ?1)")
                .bind(&input.sub_category_id)
                .fetch_one(&mut *tx)
                .await?;
        if !sub_exists {
            return Err(DbError::not_found("SubCategory", &input.sub_category_id));
        }

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                id, code, name, description, sub_category_id,
                price, stock_quantity, low_stock_threshold, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?8)
            RETURNING *
            "#,
        )
        .bind(generate_id())
        .bind(&input.code)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.sub_category_id)
        .bind(input.price)
        .bind(input.low_stock_threshold)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&input.code))?;

        audit::record(
            &mut tx,
            NewAuditLog::new(&actor.id, "product.create", "product")
                .entity(&product.id)
                .details(
                    json!({ "code": product.code, "name": product.name, "price": product.price })
                        .to_string(),
                ),
        )
        .await?;

        tx.commit().await?;

        info!(id = %product.id, code = %product.code, "Product created");
        Ok(product)
    }

    /// Applies a validated partial update. Stock cannot be set here.
    pub async fn update(&self, id: &str, update: UpdateProduct, actor: &User) -> DbResult<Product> {
        debug!(id = %id, "Updating product");

        let mut tx = begin_write(&self.pool).await?;

        if let Some(sub_id) = update.sub_category_id.as_deref() {
            let sub_exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM sub_categories WHERE id = ?1)")
                    .bind(sub_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if !sub_exists {
                return Err(DbError::not_found("SubCategory", sub_id));
            }
        }

        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                code = COALESCE(?2, code),
                name = COALESCE(?3, name),
                description = CASE WHEN ?4 IS NULL THEN description
                                   WHEN ?4 = '' THEN NULL
                                   ELSE ?4 END,
                sub_category_id = COALESCE(?5, sub_category_id),
                price = COALESCE(?6, price),
                low_stock_threshold = COALESCE(?7, low_stock_threshold),
                updated_at = ?8
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.code)
        .bind(&update.name)
        .bind(&update.description)
        .bind(&update.sub_category_id)
        .bind(update.price)
        .bind(update.low_stock_threshold)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(update.code.as_deref().unwrap_or_default()))?
        .ok_or_else(|| DbError::not_found("Product", id))?;

        audit::record(
            &mut tx,
            NewAuditLog::new(&actor.id, "product.update", "product")
                .entity(&product.id)
                .details(
                    json!({
                        "code": product.code,
                        "price": product.price,
                        "lowStockThreshold": product.low_stock_threshold,
                    })
                    .to_string(),
                ),
        )
        .await?;

        tx.commit().await?;
        Ok(product)
    }

    /// Deletes a product that has never been bought, sold or moved.
    /// Products with history are refused with `Conflict`.
    pub async fn delete(&self, id: &str, actor: &User) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let mut tx = begin_write(&self.pool).await?;

        let history: i64 = sqlx::query_scalar(
            r#"
            SELECT
                (SELECT COUNT(*) FROM purchases WHERE product_id = ?1)
              + (SELECT COUNT(*) FROM sales WHERE product_id = ?1)
              + (SELECT COUNT(*) FROM stock_movements WHERE product_id = ?1)
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if history > 0 {
            return Err(DbError::conflict(
                "Product",
                id,
                "it has purchase, sale or stock movement history",
            ));
        }

        let deleted: Option<String> =
            sqlx::query_scalar("DELETE FROM products WHERE id = ?1 RETURNING code")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(code) = deleted else {
            return Err(DbError::not_found("Product", id));
        };

        audit::record(
            &mut tx,
            NewAuditLog::new(&actor.id, "product.delete", "product")
                .entity(id)
                .details(json!({ "code": code }).to_string()),
        )
        .await?;

        tx.commit().await?;

        info!(id = %id, code = %code, "Product deleted");
        Ok(())
    }

    /// Stock recomputed from the purchase, sale and movement history.
    pub async fn replay_stock(&self, id: &str) -> DbResult<i64> {
        let replayed: i64 = sqlx::query_scalar(
            r#"
            SELECT
                COALESCE((SELECT SUM(quantity) FROM purchases WHERE product_id = ?1), 0)
              - COALESCE((SELECT SUM(quantity) FROM sales WHERE product_id = ?1), 0)
              + COALESCE((SELECT SUM(CASE direction WHEN 'in' THEN quantity ELSE -quantity END)
                          FROM stock_movements WHERE product_id = ?1), 0)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(replayed)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use duka_core::{Money, NewPurchase, DEFAULT_LIST_LIMIT};

    fn all() -> ProductFilter {
        ProductFilter {
            limit: DEFAULT_LIST_LIMIT,
            ..ProductFilter::default()
        }
    }

    #[tokio::test]
    async fn test_create_starts_at_zero_stock() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let product = test_support::product(&db, &admin, "SUG-1", 5).await;

        assert_eq!(product.stock_quantity, 0);
        assert_eq!(product.price, Money::from_major_minor(500, 0));
        assert_eq!(db.products().replay_stock(&product.id).await.unwrap(), 0);

        let listing = db.products().get_listing(&product.id).await.unwrap();
        assert_eq!(listing.sub_category_name, "Dry goods");
        assert_eq!(listing.main_category_name, "Groceries");
    }

    #[tokio::test]
    async fn test_duplicate_code_ignores_case() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let product = test_support::product(&db, &admin, "SUG-1", 5).await;

        let err = db
            .products()
            .create(
                NewProduct {
                    code: "sug-1".to_string(),
                    name: "Other".to_string(),
                    description: None,
                    sub_category_id: product.sub_category_id.clone(),
                    price: Money::zero(),
                    low_stock_threshold: 1,
                },
                &admin,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "code"));
        assert!(db.products().find_by_code("Sug-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_with_missing_sub_category() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;

        let err = db
            .products()
            .create(
                NewProduct {
                    code: "X".to_string(),
                    name: "X".to_string(),
                    description: None,
                    sub_category_id: "missing".to_string(),
                    price: Money::zero(),
                    low_stock_threshold: 1,
                },
                &admin,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "SubCategory"));
    }

    #[tokio::test]
    async fn test_update_partial() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let product = test_support::product(&db, &admin, "SUG-1", 5).await;

        let updated = db
            .products()
            .update(
                &product.id,
                UpdateProduct {
                    price: Some(Money::from_major_minor(550, 50)),
                    low_stock_threshold: Some(2),
                    ..UpdateProduct::default()
                },
                &admin,
            )
            .await
            .unwrap();

        assert_eq!(updated.price.cents(), 55_050);
        assert_eq!(updated.low_stock_threshold, 2);
        assert_eq!(updated.code, "SUG-1");
        assert_eq!(updated.stock_quantity, 0);
    }

    #[tokio::test]
    async fn test_delete_refused_with_history() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let product = test_support::product(&db, &admin, "SUG-1", 5).await;

        db.purchases()
            .create(
                NewPurchase {
                    product_id: product.id.clone(),
                    quantity: 3,
                    cost_per_unit: Money::from_major_minor(400, 0),
                    supplier_name: None,
                },
                &admin,
            )
            .await
            .unwrap();

        let err = db.products().delete(&product.id, &admin).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        assert_eq!(db.products().get(&product.id).await.unwrap().stock_quantity, 3);
    }

    #[tokio::test]
    async fn test_low_stock_listing() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let empty = test_support::product(&db, &admin, "A", 5).await;
        let stocked = test_support::product(&db, &admin, "B", 5).await;

        db.purchases()
            .create(
                NewPurchase {
                    product_id: stocked.id.clone(),
                    quantity: 50,
                    cost_per_unit: Money::from_major_minor(1, 0),
                    supplier_name: None,
                },
                &admin,
            )
            .await
            .unwrap();

        let low = db.products().list_low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, empty.id);
        assert_eq!(db.products().list(&all()).await.unwrap().len(), 2);
        assert_eq!(db.products().count().await.unwrap(), 2);
    }
}
