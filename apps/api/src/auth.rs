//! # Permission Gate
//!
//! Extractors that authenticate the request and enforce role or capability.
//!
//! ## Gate Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Request Gate                                     │
//! │                                                                         │
//! │  Cookie ──► Session ──► user_id? ──no──► 401 UNAUTHORIZED              │
//! │                            │                                            │
//! │                            ▼                                            │
//! │                 users row exists & active? ──no──► 401 (session flushed)│
//! │                            │                                            │
//! │                            ▼                                            │
//! │   CurrentUser ─────────────┤                                            │
//! │   RequireAdmin ────── role == admin? ──no──► 403 FORBIDDEN             │
//! │   RequireCapability<C> ── user.can(C)? ─no──► 403 FORBIDDEN            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The user row is re-read on every request, so deactivating an employee or
//! revoking a capability takes effect immediately for existing sessions.
//!
//! ## Example
//! ```rust,ignore
//! async fn create_sale(
//!     State(state): State<AppState>,
//!     RequireCapability(user, _): RequireCapability<caps::Sales>,
//!     ApiJson(input): ApiJson<NewSale>,
//! ) -> ApiResult<(StatusCode, Json<Sale>)> { ... }
//! ```

use std::marker::PhantomData;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;
use tracing::{debug, warn};

use duka_core::{Capability, User};

use crate::error::ApiError;
use crate::session;
use crate::state::AppState;

/// Any logged-in, active user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            tracing::error!("Session layer missing from router");
            ApiError::internal("An internal error occurred")
        })?;

        let Some(user_id) = session::user_id(&session).await? else {
            return Err(ApiError::unauthorized());
        };

        match state.db.users().get_by_id(&user_id).await? {
            Some(user) if user.is_active => Ok(CurrentUser(user)),
            Some(_) => {
                warn!(user_id = %user_id, "Session of a deactivated user rejected");
                session::log_out(&session).await?;
                Err(ApiError::unauthorized())
            }
            None => {
                debug!(user_id = %user_id, "Session refers to a missing user");
                session::log_out(&session).await?;
                Err(ApiError::unauthorized())
            }
        }
    }
}

/// A logged-in admin.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            debug!(user_id = %user.id, path = %parts.uri.path(), "Admin route refused");
            return Err(ApiError::forbidden());
        }
        Ok(RequireAdmin(user))
    }
}

/// Type-level name of a [`Capability`], for use with [`RequireCapability`].
pub trait CapabilityMarker: Send + Sync {
    const CAPABILITY: Capability;
}

/// Capability markers.
pub mod caps {
    use super::CapabilityMarker;
    use duka_core::Capability;

    macro_rules! marker {
        ($($name:ident => $cap:ident),* $(,)?) => {
            $(
                #[derive(Debug, Clone, Copy)]
                pub struct $name;

                impl CapabilityMarker for $name {
                    const CAPABILITY: Capability = Capability::$cap;
                }
            )*
        };
    }

    marker! {
        Dashboard => Dashboard,
        Purchases => Purchases,
        Sales => Sales,
        StockMovements => StockMovements,
        Reports => Reports,
    }
}

/// A logged-in user holding capability `C`. Admins always pass.
#[derive(Debug, Clone)]
pub struct RequireCapability<C>(pub User, pub PhantomData<C>);

impl<C: CapabilityMarker> FromRequestParts<AppState> for RequireCapability<C> {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        let capability = C::CAPABILITY;
        if !user.can(capability) {
            debug!(
                user_id = %user.id,
                capability = capability.as_str(),
                path = %parts.uri.path(),
                "Capability missing"
            );
            return Err(ApiError::forbidden());
        }
        Ok(RequireCapability(user, PhantomData))
    }
}
