//! Server-side sessions.
//!
//! The cookie carries only an opaque session id. The session record lives
//! in the `tower_sessions` table of the application database and holds the
//! logged-in user's id under [`USER_ID_KEY`].

use std::time::Duration as StdDuration;

use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::SameSite;
use tower_sessions::session_store::ExpiredDeletion;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::{debug, info, warn};

use duka_db::{Database, DbResult};

use crate::config::AppConfig;
use crate::error::ApiResult;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "duka_session";

/// Session key holding the authenticated user's id.
pub const USER_ID_KEY: &str = "user_id";

/// How often expired sessions are purged.
const EXPIRED_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(60 * 60);

/// Opens the session store on the application database, creating its
/// table if needed.
pub async fn store(db: &Database) -> DbResult<SqliteStore> {
    let store = SqliteStore::new(db.pool().clone());
    store.migrate().await?;
    Ok(store)
}

/// Create the session layer.
///
/// HttpOnly, SameSite=Lax, Secure when configured, expiring after
/// `session_expiry_hours` without a request.
pub fn layer(store: SqliteStore, config: &AppConfig) -> SessionManagerLayer<SqliteStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            config.session_expiry_hours,
        )))
        .with_secure(config.session_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Purges expired sessions in the background for the life of the process.
/// Expired records are already ignored on load; this only reclaims space.
pub fn spawn_expired_sweep(store: SqliteStore) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(EXPIRED_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            match store.delete_expired().await {
                Ok(()) => debug!("Expired sessions purged"),
                Err(e) => warn!(error = %e, "Failed to purge expired sessions"),
            }
        }
    })
}

/// Binds the session to `user_id` under a fresh session id.
pub async fn log_in(session: &Session, user_id: &str) -> ApiResult<()> {
    session.cycle_id().await?;
    session.insert(USER_ID_KEY, user_id).await?;
    info!(user_id = %user_id, "Session started");
    Ok(())
}

pub async fn user_id(session: &Session) -> ApiResult<Option<String>> {
    Ok(session.get::<String>(USER_ID_KEY).await?)
}

/// Deletes the session record and expires the cookie.
pub async fn log_out(session: &Session) -> ApiResult<()> {
    session.flush().await?;
    Ok(())
}
