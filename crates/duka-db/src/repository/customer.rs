//! # Customer Repository
//!
//! Reference list behind the customer field of the sale form. Sales that
//! name a new customer add them here in the same transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use duka_core::{Customer, NewAuditLog, NewContact, User};

use crate::error::{DbError, DbResult};
use crate::repository::{audit, begin_write, generate_id};

pub(crate) async fn remember(
    conn: &mut SqliteConnection,
    name: &str,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query("INSERT OR IGNORE INTO customers (id, name, created_at) VALUES (?1, ?2, ?3)")
        .bind(generate_id())
        .bind(name)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Repository for customers.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers =
            sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY name COLLATE NOCASE")
                .fetch_all(&self.pool)
                .await?;
        Ok(customers)
    }

    pub async fn create(&self, input: NewContact, actor: &User) -> DbResult<Customer> {
        debug!(name = %input.name, "Creating customer");

        let mut tx = begin_write(&self.pool).await?;

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (id, name, phone, email, created_at)
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
            NewAuditLog::new(&actor.id, "customer.create", "customer").entity(&customer.id),
        )
        .await?;

        tx.commit().await?;

        info!(id = %customer.id, name = %customer.name, "Customer created");
        Ok(customer)
    }
}
