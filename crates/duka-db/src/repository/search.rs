//! # Search Repository
//!
//! The global search box: a case-insensitive substring match over product
//! codes and names, category names and supplier/customer names. Each group
//! is capped at [`SEARCH_LIMIT`] hits.

use sqlx::SqlitePool;
use tracing::debug;

use duka_core::{
    Customer, MainCategory, ProductListing, SearchResults, SubCategory, Supplier, SEARCH_LIMIT,
};

use crate::error::DbResult;
use crate::repository::like_pattern;

/// Repository for global search.
#[derive(Debug, Clone)]
pub struct SearchRepository {
    pool: SqlitePool,
}

impl SearchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SearchRepository { pool }
    }

    /// `term` must already be trimmed and non-empty.
    pub async fn search(&self, term: &str) -> DbResult<SearchResults> {
        debug!(term = %term, "Searching");

        let pattern = like_pattern(term);

        let products = sqlx::query_as::<_, ProductListing>(
            r#"
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
            WHERE p.code LIKE ?1 ESCAPE '\' OR p.name LIKE ?1 ESCAPE '\'
            ORDER BY p.name COLLATE NOCASE
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let main_categories = sqlx::query_as::<_, MainCategory>(
            r#"
            SELECT * FROM main_categories
            WHERE name LIKE ?1 ESCAPE '\'
            ORDER BY name COLLATE NOCASE
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let sub_categories = sqlx::query_as::<_, SubCategory>(
            r#"
            SELECT * FROM sub_categories
            WHERE name LIKE ?1 ESCAPE '\'
            ORDER BY name COLLATE NOCASE
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT * FROM suppliers
            WHERE name LIKE ?1 ESCAPE '\'
            ORDER BY name COLLATE NOCASE
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT * FROM customers
            WHERE name LIKE ?1 ESCAPE '\'
            ORDER BY name COLLATE NOCASE
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(SearchResults {
            products,
            main_categories,
            sub_categories,
            suppliers,
            customers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use duka_core::NewContact;

    #[tokio::test]
    async fn test_search_groups_and_ignores_case() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        test_support::product(&db, &admin, "GRO-1", 5).await;
        db.suppliers()
            .create(
                NewContact {
                    name: "Groceries Wholesale".to_string(),
                    phone: None,
                    email: None,
                },
                &admin,
            )
            .await
            .unwrap();

        let results = db.search().search("gro").await.unwrap();
        assert_eq!(results.products.len(), 1);
        assert_eq!(results.main_categories.len(), 1);
        assert!(results.sub_categories.is_empty());
        assert_eq!(results.suppliers.len(), 1);
        assert!(results.customers.is_empty());

        let nothing = db.search().search("%").await.unwrap();
        assert!(nothing.is_empty());
    }
}
