//! # duka-api: HTTP Server for DukaSmart
//!
//! The REST API the DukaSmart web client uses.
//!
//! ## Request Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Request Pipeline                                 │
//! │                                                                         │
//! │  TraceLayer (span per request)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SessionManagerLayer (cookie ─► session record in SQLite)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Router ─► /health, /health/ready                                       │
//! │        └─► /api/...  handler(extractors: gate, ApiJson, ApiQuery)       │
//! │                         │                                               │
//! │                         ▼                                               │
//! │                 duka-db repository (one transaction)                    │
//! │                         │                                               │
//! │                         ▼                                               │
//! │                 Json<T>  or  ApiError { code, message, fields }         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Layered configuration (file + `DUKA_*` env)
//! - [`auth`] - `CurrentUser`, `RequireAdmin`, `RequireCapability<C>`
//! - [`session`] - Session store and cookie policy
//! - [`error`] - `ApiError` and its HTTP mapping
//! - [`routes`] - One module per resource

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tower_sessions_sqlx_store::SqliteStore;

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod session;
pub mod state;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::AppState;

/// Builds the full application router.
///
/// `store` must already be migrated (see [`session::store`]).
pub fn app(state: AppState, store: SqliteStore) -> Router {
    let api = Router::new()
        .nest("/auth", routes::auth::router())
        .nest("/categories", routes::categories::router())
        .nest("/products", routes::products::router())
        .nest("/purchases", routes::purchases::router())
        .nest("/sales", routes::sales::router())
        .nest("/stock-movements", routes::stock_movements::router())
        .nest("/suppliers", routes::contacts::suppliers())
        .nest("/customers", routes::contacts::customers())
        .nest("/employees", routes::employees::router())
        .nest("/reports", routes::reports::router())
        .nest("/dashboard", routes::reports::dashboard_router())
        .nest("/notifications", routes::notifications::router())
        .route("/search", get(routes::search::search))
        .route("/audit-logs", get(routes::audit::list));

    let sessions = session::layer(store, &state.config);

    Router::new()
        .merge(routes::health::router())
        .nest("/api", api)
        .layer(sessions)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
