//! GET /api/audit-logs (admin only)

use axum::extract::State;
use axum::Json;

use duka_core::AuditLog;

use crate::auth::RequireAdmin;
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::routes::ListQuery;
use crate::state::AppState;

/// Newest first.
pub async fn list(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    Ok(Json(state.db.audit_logs().list(query.limit()).await?))
}
