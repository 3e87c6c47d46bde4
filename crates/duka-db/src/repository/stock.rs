//! # Stock Adjustment
//!
//! The one place `products.stock_quantity` is written.
//!
//! ## Conditional Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two clerks sell the last 3 units at the same moment (stock = 4)       │
//! │                                                                         │
//! │  Request A: sell 3                   Request B: sell 3                 │
//! │     │                                   │                               │
//! │     ▼                                   ▼                               │
//! │  BEGIN                               BEGIN                              │
//! │  UPDATE ... SET stock = stock - 3    UPDATE ... (waits on write lock)  │
//! │   WHERE id = ? AND stock - 3 >= 0                                      │
//! │   → 1 row, stock = 1                                                   │
//! │  INSERT sale, notifications, audit                                     │
//! │  COMMIT ─────────────────────────────► lock released                  │
//! │                                      → 0 rows (1 - 3 < 0)              │
//! │                                      re-read: available = 1            │
//! │                                      InsufficientStock, ROLLBACK       │
//! │                                                                         │
//! │  The check and the write are one statement, so there is no window     │
//! │  between reading the stock and writing it.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use duka_core::{DomainEvent, Product};

use crate::error::{DbError, DbResult};

/// Outcome of a successful stock adjustment.
#[derive(Debug, Clone)]
pub struct StockChange {
    /// The product as it is after the change.
    pub product: Product,
    pub before: i64,
}

impl StockChange {
    pub fn after(&self) -> i64 {
        self.product.stock_quantity
    }

    /// The level-change event for the notification fan-out.
    pub fn level_event(&self) -> DomainEvent {
        DomainEvent::StockLevelChanged {
            product_id: self.product.id.clone(),
            product_name: self.product.name.clone(),
            before: self.before,
            after: self.after(),
            threshold: self.product.low_stock_threshold,
        }
    }
}

/// Applies a signed change to a product's stock on an open transaction.
///
/// ## Errors
/// - `NotFound` if the product doesn't exist
/// - `InsufficientStock` if the change would take stock below zero
///
/// Either error leaves the row untouched; the caller drops the
/// transaction, so nothing else is written either.
pub async fn adjust(
    conn: &mut SqliteConnection,
    product_id: &str,
    delta: i64,
    now: DateTime<Utc>,
) -> DbResult<StockChange> {
    debug!(product_id = %product_id, delta, "Adjusting stock");

    let updated = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity + ?1,
            updated_at = ?2
        WHERE id = ?3
          AND stock_quantity + ?1 >= 0
        RETURNING *
        "#,
    )
    .bind(delta)
    .bind(now)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(product) => Ok(StockChange {
            before: product.stock_quantity - delta,
            product,
        }),
        None => Err(rejection(conn, product_id, delta).await),
    }
}

/// Explains why the conditional update touched no row.
async fn rejection(conn: &mut SqliteConnection, product_id: &str, delta: i64) -> DbError {
    let current: Result<Option<(String, i64)>, sqlx::Error> =
        sqlx::query_as("SELECT code, stock_quantity FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await;

    match current {
        Ok(Some((code, available))) => {
            debug!(code = %code, available, requested = -delta, "Insufficient stock");
            DbError::InsufficientStock {
                code,
                available,
                requested: -delta,
            }
        }
        Ok(None) => DbError::not_found("Product", product_id),
        Err(e) => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;

    #[tokio::test]
    async fn test_adjust_up_and_down() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let product = test_support::product(&db, &admin, "P-1", 5).await;

        let mut tx = db.pool().begin().await.unwrap();
        let up = adjust(&mut tx, &product.id, 10, Utc::now()).await.unwrap();
        assert_eq!((up.before, up.after()), (0, 10));
        let down = adjust(&mut tx, &product.id, -4, Utc::now()).await.unwrap();
        assert_eq!((down.before, down.after()), (10, 6));
        tx.commit().await.unwrap();

        let stored = db.products().get(&product.id).await.unwrap();
        assert_eq!(stored.stock_quantity, 6);
    }

    #[tokio::test]
    async fn test_adjust_below_zero_is_rejected() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let product = test_support::product(&db, &admin, "P-1", 5).await;

        let mut tx = db.pool().begin().await.unwrap();
        adjust(&mut tx, &product.id, 2, Utc::now()).await.unwrap();
        let err = adjust(&mut tx, &product.id, -3, Utc::now()).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_adjust_missing_product() {
        let db = test_support::db().await;
        let mut tx = db.pool().begin().await.unwrap();
        let err = adjust(&mut tx, "no-such-id", 1, Utc::now()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[test]
    fn test_level_event_carries_threshold() {
        let now = Utc::now();
        let change = StockChange {
            product: Product {
                id: "p".to_string(),
                code: "P".to_string(),
                name: "Sugar".to_string(),
                description: None,
                sub_category_id: "s".to_string(),
                price: duka_core::Money::zero(),
                stock_quantity: 3,
                low_stock_threshold: 5,
                created_at: now,
                updated_at: now,
            },
            before: 8,
        };
        assert_eq!(
            change.level_event(),
            DomainEvent::StockLevelChanged {
                product_id: "p".to_string(),
                product_name: "Sugar".to_string(),
                before: 8,
                after: 3,
                threshold: 5,
            }
        );
    }
}
