//! Register, login, logout and the current-user probe.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{debug, info, warn};

use duka_core::{Capabilities, NewEmployee, User};
use duka_db::password::{hash_password, verify_dummy, verify_password};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::extract::ApiJson;
use crate::session;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/user", get(current_user))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// The user as the client sees it: `permissions` lists what the user can
/// actually do, which for admins is everything.
fn profile(mut user: User) -> User {
    user.permissions = user.effective_permissions();
    user
}

/// POST /api/auth/register
///
/// Bootstraps the first admin; afterwards open only when self-registration
/// is configured. Logs the new user in.
async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    debug!(username = %req.username, "register");

    let input = NewEmployee {
        username: req.username,
        password: req.password,
        full_name: req.full_name,
        email: req.email,
        permissions: Capabilities::empty(),
    }
    .validate()?;

    let hash = hash_password(&input.password)?;
    let user = state
        .db
        .users()
        .register(
            &input.username,
            &input.full_name,
            input.email.as_deref(),
            &hash,
            state.config.allow_self_registration,
        )
        .await?
        .ok_or_else(|| ApiError::new(ErrorCode::Forbidden, "Registration is closed"))?;

    session::log_in(&session, &user.id).await?;

    Ok((StatusCode::CREATED, Json(profile(user))))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<User>> {
    debug!(username = %req.username, "login");

    let user = state.db.users().find_by_username(&req.username).await?;

    // Unknown usernames still pay for one Argon2 verification.
    let verified = match &user {
        Some(user) => verify_password(&req.password, &user.password_hash),
        None => verify_dummy(&req.password),
    };

    let user = match user {
        Some(user) if verified && user.is_active => user,
        _ => {
            warn!(username = %req.username, "Login failed");
            return Err(ApiError::new(
                ErrorCode::Unauthorized,
                "Invalid username or password",
            ));
        }
    };

    session::log_in(&session, &user.id).await?;
    info!(user_id = %user.id, username = %user.username, "Logged in");

    Ok(Json(profile(user)))
}

/// POST /api/auth/logout
async fn logout(CurrentUser(user): CurrentUser, session: Session) -> ApiResult<StatusCode> {
    session::log_out(&session).await?;
    info!(user_id = %user.id, "Logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/user
async fn current_user(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(profile(user))
}
