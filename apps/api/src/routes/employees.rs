//! Employee management. Admin only.
//!
//! These endpoints manage employee accounts. Admin accounts are listed but
//! cannot be edited or deactivated here.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tracing::{debug, info};

use duka_core::{NewEmployee, Role, UpdateEmployee, User};
use duka_db::password::hash_password;
use duka_db::NewUserRecord;

use crate::auth::RequireAdmin;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route("/{id}", put(update_employee))
        .route("/{id}/deactivate", post(deactivate_employee))
}

async fn list_employees(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.db.users().list().await?))
}

async fn create_employee(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(input): ApiJson<NewEmployee>,
) -> ApiResult<(StatusCode, Json<User>)> {
    debug!(username = %input.username, "create_employee");
    let input = input.validate()?;

    let record = NewUserRecord {
        username: input.username,
        full_name: input.full_name,
        email: input.email,
        password_hash: hash_password(&input.password)?,
        role: Role::Employee,
        permissions: input.permissions,
    };

    let employee = state.db.users().create(record, Some(&admin)).await?;
    info!(user_id = %employee.id, by = %admin.id, "Employee added");

    Ok((StatusCode::CREATED, Json(employee)))
}

/// Loads `id` and checks it is an employee account.
async fn employee(state: &AppState, id: &str) -> ApiResult<User> {
    match state.db.users().get_by_id(id).await? {
        Some(user) if user.role == Role::Employee => Ok(user),
        _ => Err(ApiError::not_found("Employee", id)),
    }
}

/// PUT /api/employees/{id}
///
/// Absent fields stay unchanged; a blank email clears it.
async fn update_employee(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<UpdateEmployee>,
) -> ApiResult<Json<User>> {
    debug!(id = %id, "update_employee");
    let update = update.validate()?;
    employee(&state, &id).await?;

    Ok(Json(state.db.users().update(&id, update, &admin).await?))
}

async fn deactivate_employee(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    employee(&state, &id).await?;
    let user = state.db.users().deactivate(&id, &admin).await?;
    info!(user_id = %user.id, by = %admin.id, "Employee deactivated");
    Ok(Json(user))
}
