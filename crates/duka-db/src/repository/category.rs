//! # Category Repository
//!
//! Two-level catalogue: main categories contain sub-categories, and
//! products belong to exactly one sub-category.
//!
//! ## Delete Rules
//! ```text
//! MainCategory ──< SubCategory ──< Product
//!      │                 │
//!      │                 └── delete refused while it has products
//!      └── delete refused while it has sub-categories
//! ```
//!
//! Counts in the listings are computed at read time, so deleting a product
//! is reflected immediately.

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info};

use duka_core::{
    MainCategory, MainCategorySummary, NewAuditLog, NewMainCategory, NewSubCategory, SubCategory,
    SubCategorySummary, UpdateCategory, User,
};

use crate::error::{DbError, DbResult};
use crate::repository::audit;
use crate::repository::{begin_write, generate_id};

/// Repository for main and sub categories.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    // =========================================================================
    // Main categories
    // =========================================================================

    /// All main categories by name, with their sub-category and product counts.
    pub async fn list_main(&self) -> DbResult<Vec<MainCategorySummary>> {
        let categories = sqlx::query_as::<_, MainCategorySummary>(
            r#"
            SELECT
                m.id, m.name, m.description, m.created_at,
                (SELECT COUNT(*) FROM sub_categories s WHERE s.main_category_id = m.id)
                    AS sub_category_count,
                (SELECT COUNT(*) FROM products p
                    JOIN sub_categories s ON s.id = p.sub_category_id
                    WHERE s.main_category_id = m.id)
                    AS product_count
            FROM main_categories m
            ORDER BY m.name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn get_main(&self, id: &str) -> DbResult<MainCategory> {
        sqlx::query_as::<_, MainCategory>("SELECT * FROM main_categories WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("MainCategory", id))
    }

    pub async fn find_main_by_name(&self, name: &str) -> DbResult<Option<MainCategory>> {
        let category =
            sqlx::query_as::<_, MainCategory>("SELECT * FROM main_categories WHERE name = ?1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(category)
    }

    pub async fn create_main(&self, input: NewMainCategory, actor: &User) -> DbResult<MainCategory> {
        debug!(name = %input.name, "Creating main category");

        let mut tx = begin_write(&self.pool).await?;

        let category = sqlx::query_as::<_, MainCategory>(
            r#"
            INSERT INTO main_categories (id, name, description, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(generate_id())
        .bind(&input.name)
        .bind(&input.description)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&input.name))?;

        audit::record(
            &mut tx,
            NewAuditLog::new(&actor.id, "category.main.create", "main_category")
                .entity(&category.id)
                .details(json!({ "name": category.name }).to_string()),
        )
        .await?;

        tx.commit().await?;

        info!(id = %category.id, name = %category.name, "Main category created");
        Ok(category)
    }

    pub async fn update_main(
        &self,
        id: &str,
        update: UpdateCategory,
        actor: &User,
    ) -> DbResult<MainCategory> {
        let mut tx = begin_write(&self.pool).await?;

        let category = sqlx::query_as::<_, MainCategory>(
            r#"
            UPDATE main_categories SET
                name = COALESCE(?2, name),
                description = CASE WHEN ?3 IS NULL THEN description
                                   WHEN ?3 = '' THEN NULL
                                   ELSE ?3 END
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.description)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(update.name.as_deref().unwrap_or_default()))?
        .ok_or_else(|| DbError::not_found("MainCategory", id))?;

        audit::record(
            &mut tx,
            NewAuditLog::new(&actor.id, "category.main.update", "main_category")
                .entity(&category.id)
                .details(json!({ "name": category.name }).to_string()),
        )
        .await?;

        tx.commit().await?;
        Ok(category)
    }

    /// Refused with `Conflict` while the category still has sub-categories.
    pub async fn delete_main(&self, id: &str, actor: &User) -> DbResult<()> {
        debug!(id = %id, "Deleting main category");

        let mut tx = begin_write(&self.pool).await?;

        let subs: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sub_categories WHERE main_category_id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if subs > 0 {
            return Err(DbError::conflict(
                "MainCategory",
                id,
                format!("it still has {} sub-categories", subs),
            ));
        }

        let deleted: Option<String> =
            sqlx::query_scalar("DELETE FROM main_categories WHERE id = ?1 RETURNING name")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(name) = deleted else {
            return Err(DbError::not_found("MainCategory", id));
        };

        audit::record(
            &mut tx,
            NewAuditLog::new(&actor.id, "category.main.delete", "main_category")
                .entity(id)
                .details(json!({ "name": name }).to_string()),
        )
        .await?;

        tx.commit().await?;

        info!(id = %id, "Main category deleted");
        Ok(())
    }

    // =========================================================================
    // Sub-categories
    // =========================================================================

    /// Sub-categories, optionally of one main category, with product counts.
    pub async fn list_sub(&self, main_category_id: Option<&str>) -> DbResult<Vec<SubCategorySummary>> {
        let categories = sqlx::query_as::<_, SubCategorySummary>(
            r#"
            SELECT
                s.id, s.main_category_id, m.name AS main_category_name,
                s.name, s.description, s.created_at,
                (SELECT COUNT(*) FROM products p WHERE p.sub_category_id = s.id)
                    AS product_count
            FROM sub_categories s
            JOIN main_categories m ON m.id = s.main_category_id
            WHERE ?1 IS NULL OR s.main_category_id = ?1
            ORDER BY m.name COLLATE NOCASE, s.name COLLATE NOCASE
            "#,
        )
        .bind(main_category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn get_sub(&self, id: &str) -> DbResult<SubCategory> {
        sqlx::query_as::<_, SubCategory>("SELECT * FROM sub_categories WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("SubCategory", id))
    }

    pub async fn find_sub_by_name(
        &self,
        main_category_id: &str,
        name: &str,
    ) -> DbResult<Option<SubCategory>> {
        let category = sqlx::query_as::<_, SubCategory>(
            "SELECT * FROM sub_categories WHERE main_category_id = ?1 AND name = ?2",
        )
        .bind(main_category_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    /// `NotFound` if the main category doesn't exist.
    pub async fn create_sub(&self, input: NewSubCategory, actor: &User) -> DbResult<SubCategory> {
        debug!(name = %input.name, main = %input.main_category_id, "Creating sub-category");

        let mut tx = begin_write(&self.pool).await?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM main_categories WHERE id = ?1)")
                .bind(&input.main_category_id)
                .fetch_one(&mut *tx)
                .await?;
        if !exists {
            return Err(DbError::not_found("MainCategory", &input.main_category_id));
        }

        let category = sqlx::query_as::<_, SubCategory>(
            r#"
            INSERT INTO sub_categories (id, main_category_id, name, description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(generate_id())
        .bind(&input.main_category_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&input.name))?;

        audit::record(
            &mut tx,
            NewAuditLog::new(&actor.id, "category.sub.create", "sub_category")
                .entity(&category.id)
                .details(
                    json!({ "name": category.name, "mainCategoryId": category.main_category_id })
                        .to_string(),
                ),
        )
        .await?;

        tx.commit().await?;

        info!(id = %category.id, name = %category.name, "Sub-category created");
        Ok(category)
    }

    pub async fn update_sub(
        &self,
        id: &str,
        update: UpdateCategory,
        actor: &User,
    ) -> DbResult<SubCategory> {
        let mut tx = begin_write(&self.pool).await?;

        let category = sqlx::query_as::<_, SubCategory>(
            r#"
            UPDATE sub_categories SET
                name = COALESCE(?2, name),
                description = CASE WHEN ?3 IS NULL THEN description
                                   WHEN ?3 = '' THEN NULL
                                   ELSE ?3 END
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.description)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(update.name.as_deref().unwrap_or_default()))?
        .ok_or_else(|| DbError::not_found("SubCategory", id))?;

        audit::record(
            &mut tx,
            NewAuditLog::new(&actor.id, "category.sub.update", "sub_category")
                .entity(&category.id)
                .details(json!({ "name": category.name }).to_string()),
        )
        .await?;

        tx.commit().await?;
        Ok(category)
    }

    /// Refused with `Conflict` while the sub-category still has products.
    pub async fn delete_sub(&self, id: &str, actor: &User) -> DbResult<()> {
        debug!(id = %id, "Deleting sub-category");

        let mut tx = begin_write(&self.pool).await?;

        let products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE sub_category_id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if products > 0 {
            return Err(DbError::conflict(
                "SubCategory",
                id,
                format!("it still has {} products", products),
            ));
        }

        let deleted: Option<String> =
            sqlx::query_scalar("DELETE FROM sub_categories WHERE id = ?1 RETURNING name")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(name) = deleted else {
            return Err(DbError::not_found("SubCategory", id));
        };

        audit::record(
            &mut tx,
            NewAuditLog::new(&actor.id, "category.sub.delete", "sub_category")
                .entity(id)
                .details(json!({ "name": name }).to_string()),
        )
        .await?;

        tx.commit().await?;

        info!(id = %id, "Sub-category deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;

    fn main(name: &str) -> NewMainCategory {
        NewMainCategory {
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_main_name_ignores_case() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let repo = db.categories();

        repo.create_main(main("Beverages"), &admin).await.unwrap();
        let err = repo.create_main(main("beverages"), &admin).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref field, ref value } if field == "name" && value == "beverages"
        ));
    }

    #[tokio::test]
    async fn test_sub_requires_existing_main() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;

        let err = db
            .categories()
            .create_sub(
                NewSubCategory {
                    main_category_id: "missing".to_string(),
                    name: "Sodas".to_string(),
                    description: None,
                },
                &admin,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "MainCategory"));
    }

    #[tokio::test]
    async fn test_counts_follow_product_delete() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let p1 = test_support::product(&db, &admin, "P-1", 5).await;
        test_support::product(&db, &admin, "P-2", 5).await;

        let mains = db.categories().list_main().await.unwrap();
        assert_eq!(mains.len(), 1);
        assert_eq!((mains[0].sub_category_count, mains[0].product_count), (1, 2));

        db.products().delete(&p1.id, &admin).await.unwrap();

        let mains = db.categories().list_main().await.unwrap();
        assert_eq!((mains[0].sub_category_count, mains[0].product_count), (1, 1));
        let subs = db.categories().list_sub(Some(&mains[0].id)).await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].product_count, 1);
        assert_eq!(subs[0].main_category_name, "Groceries");
    }

    #[tokio::test]
    async fn test_delete_refused_while_in_use() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let product = test_support::product(&db, &admin, "P-1", 5).await;
        let sub = db.categories().get_sub(&product.sub_category_id).await.unwrap();

        let err = db.categories().delete_sub(&sub.id, &admin).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        let err = db
            .categories()
            .delete_main(&sub.main_category_id, &admin)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        db.products().delete(&product.id, &admin).await.unwrap();
        db.categories().delete_sub(&sub.id, &admin).await.unwrap();
        db.categories().delete_main(&sub.main_category_id, &admin).await.unwrap();
        assert!(db.categories().list_main().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_clears_description_with_blank() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let repo = db.categories();
        let created = repo
            .create_main(
                NewMainCategory {
                    name: "Dairy".to_string(),
                    description: Some("Milk and such".to_string()),
                },
                &admin,
            )
            .await
            .unwrap();

        let renamed = repo
            .update_main(
                &created.id,
                UpdateCategory {
                    name: Some("Dairy & Eggs".to_string()),
                    description: None,
                },
                &admin,
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Dairy & Eggs");
        assert_eq!(renamed.description.as_deref(), Some("Milk and such"));

        let cleared = repo
            .update_main(
                &created.id,
                UpdateCategory {
                    name: None,
                    description: Some(String::new()),
                },
                &admin,
            )
            .await
            .unwrap();
        assert_eq!(cleared.description, None);

        assert!(matches!(
            repo.update_main("missing", UpdateCategory::default(), &admin).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
