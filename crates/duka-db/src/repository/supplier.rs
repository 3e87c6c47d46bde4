//! # Supplier Repository
//!
//! Reference list behind the supplier field of the purchase form. Names are
//! added explicitly or remembered automatically when a purchase names a
//! supplier that isn't listed yet.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use duka_core::{NewAuditLog, NewContact, Supplier, User};

use crate::error::{DbError, DbResult};
use crate::repository::{audit, begin_write, generate_id};

/// Adds `name` to the list unless it is already there (case-insensitive).
pub(crate) async fn remember(
    conn: &mut SqliteConnection,
    name: &str,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query("INSERT OR IGNORE INTO suppliers (id, name, created_at) VALUES (?1, ?2, ?3)")
        .bind(generate_id())
        .bind(name)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Repository for suppliers.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let suppliers =
            sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers ORDER BY name COLLATE NOCASE")
                .fetch_all(&self.pool)
                .await?;
        Ok(suppliers)
    }

    pub async fn create(&self, input: NewContact, actor: &User) -> DbResult<Supplier> {
        debug!(name = %input.name, "Creating supplier");

        let mut tx = begin_write(&self.pool).await?;

        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (id, name, phone, email, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(generate_id())
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&input.name))?;

        audit::record(
            &mut tx,
            NewAuditLog::new(&actor.id, "supplier.create", "supplier").entity(&supplier.id),
        )
        .await?;

        tx.commit().await?;

        info!(id = %supplier.id, name = %supplier.name, "Supplier created");
        Ok(supplier)
    }
}
