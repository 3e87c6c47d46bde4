//! The shared notification feed. Any logged-in user.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use duka_core::{clamp_limit, Notification, NotificationAction};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/{id}/read", post(mark_read))
        .route("/{id}/dismiss", post(dismiss))
        .route("/{id}/execute", post(execute_action))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

#[derive(Debug, Serialize)]
pub struct ActionResult {
    pub action: Option<NotificationAction>,
}

/// GET /api/notifications?unreadOnly=&limit=
async fn list_notifications(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiQuery(query): ApiQuery<FeedQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let feed = state
        .db
        .notifications()
        .list(query.unread_only, clamp_limit(query.limit))
        .await?;
    Ok(Json(feed))
}

async fn unread_count(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<Json<UnreadCount>> {
    let count = state.db.notifications().unread_count().await?;
    Ok(Json(UnreadCount { count }))
}

async fn mark_read(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Notification>> {
    Ok(Json(state.db.notifications().mark_read(&id).await?))
}

async fn mark_all_read(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<Json<MarkedRead>> {
    let updated = state.db.notifications().mark_all_read().await?;
    Ok(Json(MarkedRead { updated }))
}

async fn dismiss(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Notification>> {
    Ok(Json(state.db.notifications().dismiss(&id).await?))
}

/// Marks the notification read and hands its suggested action (or `null`)
/// back to the client, which performs it.
async fn execute_action(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ActionResult>> {
    let action = state.db.notifications().execute_action(&id).await?;
    Ok(Json(ActionResult { action }))
}
