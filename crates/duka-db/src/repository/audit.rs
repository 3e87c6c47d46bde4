//! # Audit Log Repository
//!
//! Append-only record of who changed what. Entries are written with
//! [`record`] on the same connection (usually an open transaction) as the
//! change itself, so an audit row exists exactly when the change does.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use duka_core::{AuditLog, NewAuditLog};

use crate::error::DbResult;
use crate::repository::generate_id;

/// Writes one audit entry on the given connection.
pub async fn record(conn: &mut SqliteConnection, entry: NewAuditLog) -> DbResult<AuditLog> {
    debug!(action = entry.action, entity = entry.entity_type, "Recording audit entry");

    let log = sqlx::query_as::<_, AuditLog>(
        r#"
        INSERT INTO audit_logs (id, user_id, action, entity_type, entity_id, details, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING *
        "#,
    )
    .bind(generate_id())
    .bind(entry.user_id)
    .bind(entry.action)
    .bind(entry.entity_type)
    .bind(entry.entity_id)
    .bind(entry.details)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(log)
}

/// Read side of the audit trail.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: SqlitePool,
}

impl AuditLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AuditLogRepository { pool }
    }

    /// Newest first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<AuditLog>> {
        let logs = sqlx::query_as::<_, AuditLog>(
            "SELECT * FROM audit_logs ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    pub async fn list_for_entity(&self, entity_type: &str, entity_id: &str) -> DbResult<Vec<AuditLog>> {
        let logs = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT * FROM audit_logs
            WHERE entity_type = ?1 AND entity_id = ?2
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;

    #[tokio::test]
    async fn test_record_and_list_newest_first() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;

        let mut conn = db.pool().acquire().await.unwrap();
        record(&mut conn, NewAuditLog::new(&admin.id, "test.first", "thing").entity("t1"))
            .await
            .unwrap();
        record(
            &mut conn,
            NewAuditLog::new(&admin.id, "test.second", "thing")
                .entity("t1")
                .details("{}"),
        )
        .await
        .unwrap();
        drop(conn);

        let logs = db.audit_logs().list_for_entity("thing", "t1").await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].action, "test.second");
        assert_eq!(logs[0].user_id.as_deref(), Some(admin.id.as_str()));
    }
}
