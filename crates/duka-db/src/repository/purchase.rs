//! # Purchase Repository
//!
//! Stock intake. Each purchase is its own immutable row with its own unit
//! cost; there is no cost averaging.
//!
//! ## Transaction
//! ```text
//! BEGIN
//!   stock::adjust(+quantity)            stock_quantity += q
//!   INSERT INTO purchases               total_cost = q × cost_per_unit
//!   INSERT OR IGNORE INTO suppliers     remember the supplier name
//!   publish PurchaseRecorded            new_purchase notification
//!   audit purchase.create
//! COMMIT
//! ```

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info};

use duka_core::{
    DomainEvent, NewAuditLog, NewPurchase, Purchase, PurchaseListing, User, ValidationError,
};

use crate::error::{DbError, DbResult};
use crate::repository::notification::EventPublisher;
use crate::repository::{audit, begin_write, generate_id, stock, supplier};

/// Repository for purchases.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Records a purchase and adds its quantity to stock.
    ///
    /// `input` must already be validated.
    pub async fn create(&self, input: NewPurchase, actor: &User) -> DbResult<Purchase> {
        debug!(product_id = %input.product_id, quantity = input.quantity, "Recording purchase");

        let total_cost = input
            .cost_per_unit
            .multiply_quantity(input.quantity)
            .ok_or_else(|| {
                DbError::Invalid(
                    ValidationError::OutOfRange {
                        field: "costPerUnit".to_string(),
                        min: 0,
                        max: i64::MAX,
                    }
                    .into(),
                )
            })?;

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let change = stock::adjust(&mut tx, &input.product_id, input.quantity, now).await?;

        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            INSERT INTO purchases (
                id, product_id, quantity, cost_per_unit, total_cost,
                supplier_name, purchased_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING *
            "#,
        )
        .bind(generate_id())
        .bind(&input.product_id)
        .bind(input.quantity)
        .bind(input.cost_per_unit)
        .bind(total_cost)
        .bind(&input.supplier_name)
        .bind(&actor.id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(name) = purchase.supplier_name.as_deref() {
            supplier::remember(&mut tx, name, now).await?;
        }

        tx.publish(&DomainEvent::PurchaseRecorded {
            product_id: change.product.id.clone(),
            product_name: change.product.name.clone(),
            quantity: purchase.quantity,
            total_cost: purchase.total_cost,
            supplier_name: purchase.supplier_name.clone(),
        })
        .await?;
        tx.publish(&change.level_event()).await?;

        audit::record(
            &mut tx,
            NewAuditLog::new(&actor.id, "purchase.create", "purchase")
                .entity(&purchase.id)
                .details(
                    json!({
                        "productCode": change.product.code,
                        "quantity": purchase.quantity,
                        "totalCost": purchase.total_cost,
                        "stockBefore": change.before,
                        "stockAfter": change.after(),
                    })
                    .to_string(),
                ),
        )
        .await?;

        tx.commit().await?;

        info!(
            purchase_id = %purchase.id,
            code = %change.product.code,
            quantity = purchase.quantity,
            stock = change.after(),
            "Purchase recorded"
        );
        Ok(purchase)
    }

    /// Newest first, with product and buyer names.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<PurchaseListing>> {
        let purchases = sqlx::query_as::<_, PurchaseListing>(
            r#"
            SELECT
                pu.id, pu.product_id, p.code AS product_code, p.name AS product_name,
                pu.quantity, pu.cost_per_unit, pu.total_cost, pu.supplier_name,
                pu.purchased_by, u.full_name AS purchased_by_name, pu.created_at
            FROM purchases pu
            JOIN products p ON p.id = pu.product_id
            JOIN users u ON u.id = pu.purchased_by
            ORDER BY pu.created_at DESC, pu.rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
