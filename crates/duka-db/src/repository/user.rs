//! # User Repository
//!
//! Accounts, self-registration and employee management.
//!
//! ## Registration Bootstrap
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/auth/register                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT INTO users ... SELECT                                          │
//! │    role = CASE WHEN no users yet THEN 'admin' ELSE 'employee' END     │
//! │    WHERE no users yet OR self-registration allowed                     │
//! │       │                                                                 │
//! │       ├── 1 row  → account created (first one is the admin)           │
//! │       └── 0 rows → registration closed (None)                          │
//! │                                                                         │
//! │  One statement, so two simultaneous first registrations cannot both   │
//! │  become admin.                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info};

use duka_core::{Capabilities, DomainEvent, NewAuditLog, Role, UpdateEmployee, User};

use crate::error::{DbError, DbResult};
use crate::password::hash_password;
use crate::repository::audit;
use crate::repository::{begin_write, generate_id};
use crate::repository::notification::EventPublisher;

/// A user row about to be inserted. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub permissions: Capabilities,
}

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Case-insensitive lookup.
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?1")
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Every account, admins first, then by name.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY role = 'employee', full_name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Creates an account. `actor` is the admin doing it, if any.
    ///
    /// Employees added this way raise an `EmployeeAdded` notification.
    pub async fn create(&self, record: NewUserRecord, actor: Option<&User>) -> DbResult<User> {
        debug!(username = %record.username, role = record.role.as_str(), "Creating user");

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, username, full_name, email, password_hash,
                role, permissions, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)
            RETURNING *
            "#,
        )
        .bind(generate_id())
        .bind(&record.username)
        .bind(&record.full_name)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(record.role)
        .bind(record.permissions)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&record.username))?;

        if user.role == Role::Employee {
            tx.publish(&DomainEvent::EmployeeAdded {
                username: user.username.clone(),
                full_name: user.full_name.clone(),
            })
            .await?;
        }

        audit::record(
            &mut tx,
            NewAuditLog {
                user_id: actor.map(|a| a.id.clone()),
                action: "user.create",
                entity_type: "user",
                entity_id: Some(user.id.clone()),
                details: Some(
                    json!({ "username": user.username, "role": user.role.as_str() }).to_string(),
                ),
            },
        )
        .await?;

        tx.commit().await?;

        info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    /// Self-registration.
    ///
    /// The first account ever becomes the admin. After that, an employee
    /// with no capabilities is created only if `allow_self_registration`;
    /// otherwise `Ok(None)`.
    pub async fn register(
        &self,
        username: &str,
        full_name: &str,
        email: Option<&str>,
        password_hash: &str,
        allow_self_registration: bool,
    ) -> DbResult<Option<User>> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, username, full_name, email, password_hash,
                role, permissions, is_active, created_at, updated_at
            )
            SELECT ?1, ?2, ?3, ?4, ?5,
                   CASE WHEN EXISTS (SELECT 1 FROM users) THEN 'employee' ELSE 'admin' END,
                   0, 1, ?6, ?6
            WHERE ?7 OR NOT EXISTS (SELECT 1 FROM users)
            RETURNING *
            "#,
        )
        .bind(generate_id())
        .bind(username)
        .bind(full_name)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .bind(allow_self_registration)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(username))?;

        let Some(user) = user else {
            debug!(username = %username, "Registration closed");
            return Ok(None);
        };

        if user.role == Role::Employee {
            tx.publish(&DomainEvent::EmployeeAdded {
                username: user.username.clone(),
                full_name: user.full_name.clone(),
            })
            .await?;
        }

        audit::record(
            &mut tx,
            NewAuditLog::new(&user.id, "user.register", "user")
                .entity(&user.id)
                .details(json!({ "role": user.role.as_str() }).to_string()),
        )
        .await?;

        tx.commit().await?;

        info!(user_id = %user.id, role = user.role.as_str(), "User registered");
        Ok(Some(user))
    }

    /// Applies a validated partial update to an employee account.
    pub async fn update(&self, id: &str, update: UpdateEmployee, actor: &User) -> DbResult<User> {
        debug!(id = %id, "Updating user");

        let password_hash = match update.password.as_deref() {
            Some(p) => Some(hash_password(p)?),
            None => None,
        };
        // Blank email clears it.
        let email = update.email.map(|e| if e.is_empty() { None } else { Some(e) });

        let mut tx = begin_write(&self.pool).await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                full_name = COALESCE(?2, full_name),
                email = CASE WHEN ?3 THEN ?4 ELSE email END,
                password_hash = COALESCE(?5, password_hash),
                permissions = COALESCE(?6, permissions),
                is_active = COALESCE(?7, is_active),
                updated_at = ?8
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.full_name)
        .bind(email.is_some())
        .bind(email.flatten())
        .bind(password_hash)
        .bind(update.permissions)
        .bind(update.is_active)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("User", id))?;

        audit::record(
            &mut tx,
            NewAuditLog::new(&actor.id, "user.update", "user")
                .entity(&user.id)
                .details(
                    json!({
                        "permissions": user.permissions,
                        "isActive": user.is_active,
                        "passwordChanged": update.password.is_some(),
                    })
                    .to_string(),
                ),
        )
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Soft-disables an account. Its sessions stop working on the next
    /// request because every authenticated request re-reads the user.
    pub async fn deactivate(&self, id: &str, actor: &User) -> DbResult<User> {
        if id == actor.id {
            return Err(DbError::conflict("User", id, "you cannot deactivate yourself"));
        }

        self.update(
            id,
            UpdateEmployee {
                is_active: Some(false),
                ..UpdateEmployee::default()
            },
            actor,
        )
        .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::verify_password;
    use crate::repository::test_support;
    use duka_core::{Capability, NotificationKind};

    async fn register(db: &crate::Database, name: &str, allow: bool) -> Option<User> {
        db.users()
            .register(name, name, None, "hash", allow)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_registration_is_admin() {
        let db = test_support::db().await;
        let first = register(&db, "owner", false).await.unwrap();
        assert_eq!(first.role, Role::Admin);

        // Closed afterwards unless self-registration is allowed.
        assert!(register(&db, "someone", false).await.is_none());

        let second = register(&db, "clerk", true).await.unwrap();
        assert_eq!(second.role, Role::Employee);
        assert!(second.permissions.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_unique_violation() {
        let db = test_support::db().await;
        test_support::admin(&db).await;
        let err = db
            .users()
            .register("ADMIN", "Other", None, "hash", true)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "username"));
    }

    #[tokio::test]
    async fn test_employee_added_notifies() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        test_support::user(&db, "juma", Role::Employee, Capabilities::empty()).await;

        let feed = db.notifications().list(false, 10).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].kind, NotificationKind::EmployeeAdded);
        assert!(admin.is_admin());
    }

    #[tokio::test]
    async fn test_update_permissions_and_password() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let clerk = test_support::user(&db, "clerk", Role::Employee, Capabilities::empty()).await;

        let updated = db
            .users()
            .update(
                &clerk.id,
                UpdateEmployee {
                    permissions: Some(Capabilities::from_iter([Capability::Sales])),
                    password: Some("new-secret".to_string()),
                    email: Some("clerk@duka.test".to_string()),
                    ..UpdateEmployee::default()
                },
                &admin,
            )
            .await
            .unwrap();

        assert!(updated.can(Capability::Sales));
        assert!(!updated.can(Capability::Reports));
        assert!(verify_password("new-secret", &updated.password_hash));
        assert_eq!(updated.email.as_deref(), Some("clerk@duka.test"));
        assert_eq!(updated.full_name, clerk.full_name);
    }

    #[tokio::test]
    async fn test_deactivate() {
        let db = test_support::db().await;
        let admin = test_support::admin(&db).await;
        let clerk = test_support::user(&db, "clerk", Role::Employee, Capabilities::empty()).await;

        let off = db.users().deactivate(&clerk.id, &admin).await.unwrap();
        assert!(!off.is_active);

        let err = db.users().deactivate(&admin.id, &admin).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_find_by_username_ignores_case() {
        let db = test_support::db().await;
        test_support::admin(&db).await;
        assert!(db.users().find_by_username("Admin").await.unwrap().is_some());
        assert!(db.users().find_by_username("nobody").await.unwrap().is_none());
    }
}
