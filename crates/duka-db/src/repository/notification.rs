//! # Notification Repository
//!
//! The persisted notification feed and the publish side of domain events.
//!
//! ## Transactional Publishing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SINGLE TRANSACTION                                   │
//! │                                                                         │
//! │  1. UPDATE products SET stock_quantity = ...                           │
//! │  2. INSERT INTO sales (...)                                            │
//! │  3. tx.publish(&SaleRecorded { .. })                                   │
//! │       └── INSERT INTO notifications (new_sale)                         │
//! │  4. tx.publish(&StockLevelChanged { before: 6, after: 1, t: 5 })       │
//! │       └── INSERT INTO notifications (low_stock, action: restock)       │
//! │  5. INSERT INTO audit_logs (...)                                       │
//! │                                                                         │
//! │  COMMIT ← all of it, or none of it                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Feed Operations
//! - list (newest first, dismissed hidden, optional unread-only)
//! - unread count
//! - mark one read / mark all read / dismiss (all idempotent)
//! - execute action: marks read and reports the suggested action

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::future::Future;
use tracing::debug;

use duka_core::{notifications_for, DomainEvent, Notification, NotificationAction};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;

// =============================================================================
// Event Publisher
// =============================================================================

/// Turns domain events into stored notifications.
pub trait EventPublisher {
    /// Publishes one event, returning the notifications it produced.
    fn publish(
        &mut self,
        event: &DomainEvent,
    ) -> impl Future<Output = DbResult<Vec<Notification>>> + Send;
}

/// Publishing on a connection writes the notifications on that connection.
/// Called on an open transaction, they commit or roll back with it.
impl EventPublisher for SqliteConnection {
    async fn publish(&mut self, event: &DomainEvent) -> DbResult<Vec<Notification>> {
        let now = Utc::now();
        let mut written = Vec::new();

        for new in notifications_for(event) {
            debug!(kind = ?new.kind, "Publishing notification");

            let notification = sqlx::query_as::<_, Notification>(
                r#"
                INSERT INTO notifications (
                    id, kind, title, message, product_id, action,
                    is_read, is_dismissed, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, ?7)
                RETURNING *
                "#,
            )
            .bind(generate_id())
            .bind(new.kind)
            .bind(new.title)
            .bind(new.message)
            .bind(new.product_id)
            .bind(new.action)
            .bind(now)
            .fetch_one(&mut *self)
            .await?;

            written.push(notification);
        }

        Ok(written)
    }
}

// =============================================================================
// Feed
// =============================================================================

/// Repository for the notification feed.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Newest first; dismissed notifications are never listed.
    pub async fn list(&self, unread_only: bool, limit: i64) -> DbResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE is_dismissed = 0
              AND (?1 = 0 OR is_read = 0)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(unread_only)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    pub async fn get(&self, id: &str) -> DbResult<Notification> {
        sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Notification", id))
    }

    pub async fn unread_count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE is_read = 0 AND is_dismissed = 0",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Marks one notification read. Marking it again is a no-op.
    pub async fn mark_read(&self, id: &str) -> DbResult<Notification> {
        debug!(id = %id, "Marking notification read");

        sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Notification", id))
    }

    /// Marks every visible unread notification read; returns how many changed.
    pub async fn mark_all_read(&self) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1 WHERE is_read = 0 AND is_dismissed = 0",
        )
        .execute(&self.pool)
        .await?;

        debug!(count = result.rows_affected(), "Marked all notifications read");
        Ok(result.rows_affected())
    }

    /// Hides a notification from the feed. Dismissing twice is a no-op.
    pub async fn dismiss(&self, id: &str) -> DbResult<Notification> {
        debug!(id = %id, "Dismissing notification");

        sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET is_dismissed = 1 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Notification", id))
    }

    /// "Executes" the suggested action: marks the notification read and
    /// returns the action for the client to follow. Nothing else happens
    /// server-side.
    pub async fn execute_action(&self, id: &str) -> DbResult<Option<NotificationAction>> {
        let notification = self.mark_read(id).await?;
        Ok(notification.action)
    }

    /// Publishes an event outside any other transaction.
    pub async fn publish(&self, event: &DomainEvent) -> DbResult<Vec<Notification>> {
        let mut conn = self.pool.acquire().await?;
        conn.publish(event).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use duka_core::{Money, NotificationKind};

    fn sale_event() -> DomainEvent {
        DomainEvent::SaleRecorded {
            product_id: "p1".to_string(),
            product_name: "Sugar".to_string(),
            quantity: 1,
            total_amount: Money::from_cents(500),
            sold_by: "jane".to_string(),
        }
    }

    fn low_stock_event() -> DomainEvent {
        DomainEvent::StockLevelChanged {
            product_id: "p1".to_string(),
            product_name: "Sugar".to_string(),
            before: 6,
            after: 2,
            threshold: 5,
        }
    }

    #[tokio::test]
    async fn test_publish_and_list_newest_first() {
        let db = test_support::db().await;
        let repo = db.notifications();

        repo.publish(&sale_event()).await.unwrap();
        repo.publish(&low_stock_event()).await.unwrap();

        let feed = repo.list(false, 50).await.unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].kind, NotificationKind::LowStock);
        assert_eq!(feed[0].action, Some(NotificationAction::Restock));
        assert_eq!(feed[1].kind, NotificationKind::NewSale);
        assert_eq!(repo.unread_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_mark_read_twice_is_idempotent() {
        let db = test_support::db().await;
        let repo = db.notifications();
        let id = repo.publish(&sale_event()).await.unwrap()[0].id.clone();

        let first = repo.mark_read(&id).await.unwrap();
        let second = repo.mark_read(&id).await.unwrap();
        assert!(first.is_read);
        assert!(second.is_read);
        assert_eq!(repo.unread_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dismissed_are_hidden() {
        let db = test_support::db().await;
        let repo = db.notifications();
        let id = repo.publish(&sale_event()).await.unwrap()[0].id.clone();

        repo.dismiss(&id).await.unwrap();
        repo.dismiss(&id).await.unwrap();
        assert!(repo.list(false, 50).await.unwrap().is_empty());
        assert_eq!(repo.unread_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_all_read_counts_changes() {
        let db = test_support::db().await;
        let repo = db.notifications();
        repo.publish(&sale_event()).await.unwrap();
        repo.publish(&sale_event()).await.unwrap();

        assert_eq!(repo.mark_all_read().await.unwrap(), 2);
        assert_eq!(repo.mark_all_read().await.unwrap(), 0);
        assert!(repo.list(true, 50).await.unwrap().is_empty());
        assert_eq!(repo.list(false, 50).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_execute_action() {
        let db = test_support::db().await;
        let repo = db.notifications();
        let low = repo.publish(&low_stock_event()).await.unwrap()[0].id.clone();
        let sale = repo.publish(&sale_event()).await.unwrap()[0].id.clone();

        assert_eq!(
            repo.execute_action(&low).await.unwrap(),
            Some(NotificationAction::Restock)
        );
        assert_eq!(repo.execute_action(&sale).await.unwrap(), None);
        assert!(repo.get(&low).await.unwrap().is_read);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let db = test_support::db().await;
        let repo = db.notifications();
        assert!(matches!(
            repo.mark_read("missing").await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            repo.dismiss("missing").await,
            Err(DbError::NotFound { .. })
        ));
    }
}
