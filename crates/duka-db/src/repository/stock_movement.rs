//! # Stock Movement Repository
//!
//! Manual stock corrections: breakage, stock-take differences, returns.
//! An `out` movement follows the same rule as a sale and can never take
//! stock below zero.

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info};

use duka_core::{
    DomainEvent, NewAuditLog, NewStockMovement, StockMovement, StockMovementListing, User,
};

use crate::error::DbResult;
use crate::repository::notification::EventPublisher;
use crate::repository::{audit, begin_write, generate_id, stock};

/// Repository for stock movements.
#[derive(Debug, Clone)]
pub struct StockMovementRepository {
    pool: SqlitePool,
}

impl StockMovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockMovementRepository { pool }
    }

    /// Records a movement and applies it to stock in one transaction.
    pub async fn create(&self, input: NewStockMovement, actor: &User) -> DbResult<StockMovement> {
        debug!(
            product_id = %input.product_id,
            direction = input.direction.as_str(),
            quantity = input.quantity,
            "Recording stock movement"
        );

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let delta = input.direction.signed(input.quantity);
        let change = stock::adjust(&mut tx, &input.product_id, delta, now).await?;

        let movement = sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements (
                id, product_id, direction, quantity, reason, performed_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING *
            "#,
        )
        .bind(generate_id())
        .bind(&input.product_id)
        .bind(input.direction)
        .bind(input.quantity)
        .bind(&input.reason)
        .bind(&actor.id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.publish(&DomainEvent::StockMoved {
            product_id: change.product.id.clone(),
            product_name: change.product.name.clone(),
            direction: movement.direction,
            quantity: movement.quantity,
            reason: movement.reason.clone(),
        })
        .await?;
        tx.publish(&change.level_event()).await?;

        audit::record(
            &mut tx,
            NewAuditLog::new(&actor.id, "stock_movement.create", "stock_movement")
                .entity(&movement.id)
                .details(
                    json!({
                        "productCode": change.product.code,
                        "direction": movement.direction.as_str(),
                        "quantity": movement.quantity,
                        "stockBefore": change.before,
                        "stockAfter": change.after(),
                    })
                    .to_string(),
                ),
        )
        .await?;

        tx.commit().await?;

        info!(
            movement_id = %movement.id,
            code = %change.product.code,
            delta,
            stock = change.after(),
            "Stock movement recorded"
        );
        Ok(movement)
    }

    /// Newest first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<StockMovementListing>> {
        let movements = sqlx::query_as::<_, StockMovementListing>(
            r#"
            SELECT
                m.id, m.product_id, p.code AS product_code, p.name AS product_name,
                m.direction, m.quantity, m.reason,
                m.performed_by, u.full_name AS performed_by_name, m.created_at
            FROM stock_movements m
            JOIN products p ON p.id = m.product_id
            JOIN users u ON u.id = m.performed_by
            ORDER BY m.created_at DESC, m.rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support;
    use duka_core::{Capabilities, Capability, Money, NewPurchase, NewSale, Role, StockDirection};

    fn movement(product_id: &str, direction: StockDirection, quantity: i64) -> NewStockMovement {
        NewStockMovement {
            product_id: product_id.to_string(),
            direction,
            quantity,
            reason: Some("stock take".to_string()),
        }
    }

    #[tokio::test]
    async fn test_out_movement_beyond_stock_is_refused() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let product = test_support::product(&db, &admin, "OIL-1", 1).await;

        db.stock_movements()
            .create(movement(&product.id, StockDirection::In, 4), &admin)
            .await
            .unwrap();
        let err = db
            .stock_movements()
            .create(movement(&product.id, StockDirection::Out, 5), &admin)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::InsufficientStock { available: 4, requested: 5, .. }));
        assert_eq!(db.products().get(&product.id).await.unwrap().stock_quantity, 4);
        assert_eq!(db.stock_movements().list(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replay_matches_stored_stock() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let clerk = test_support::user(
            &db,
            "clerk",
            Role::Employee,
            Capabilities::from_iter([Capability::Sales, Capability::StockMovements]),
        )
        .await;
        let product = test_support::product(&db, &admin, "OIL-1", 3).await;

        db.purchases()
            .create(
                NewPurchase {
                    product_id: product.id.clone(),
                    quantity: 20,
                    cost_per_unit: Money::from_major_minor(1000, 0),
                    supplier_name: None,
                },
                &admin,
            )
            .await
            .unwrap();
        for quantity in [5, 3] {
            db.sales()
                .create(
                    NewSale {
                        product_id: product.id.clone(),
                        quantity,
                        sale_price: None,
                        customer_name: None,
                    },
                    &clerk,
                )
                .await
                .unwrap();
        }
        db.stock_movements()
            .create(movement(&product.id, StockDirection::Out, 2), &clerk)
            .await
            .unwrap();
        db.stock_movements()
            .create(movement(&product.id, StockDirection::In, 1), &clerk)
            .await
            .unwrap();
        // Refused, so not part of the history.
        let _ = db
            .sales()
            .create(
                NewSale {
                    product_id: product.id.clone(),
                    quantity: 100,
                    sale_price: None,
                    customer_name: None,
                },
                &clerk,
            )
            .await
            .unwrap_err();

        let stored = db.products().get(&product.id).await.unwrap().stock_quantity;
        assert_eq!(stored, 20 - 5 - 3 - 2 + 1);
        assert_eq!(db.products().replay_stock(&product.id).await.unwrap(), stored);

        let listed = db.stock_movements().list(10).await.unwrap();
        assert_eq!(listed[0].direction, StockDirection::In);
        assert_eq!(listed[0].performed_by_name, clerk.full_name);
    }
}
