//! Sales. Gated on the `sales` capability.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::debug;

use duka_core::{NewSale, Sale, SaleListing};

use crate::auth::{caps, RequireCapability};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::routes::ListQuery;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/recent", get(recent_sales))
}

async fn list_sales(
    State(state): State<AppState>,
    _user: RequireCapability<caps::Sales>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<SaleListing>>> {
    Ok(Json(state.db.sales().list(query.limit()).await?))
}

/// Sales of the last 24 hours.
async fn recent_sales(
    State(state): State<AppState>,
    _user: RequireCapability<caps::Sales>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<SaleListing>>> {
    Ok(Json(state.db.sales().recent(query.limit()).await?))
}

/// POST /api/sales
///
/// ## Flow
/// 1. Validate quantity and optional price
/// 2. Decrement stock only if enough is on hand (else 422, nothing written)
/// 3. Record the sale, its notifications and the audit entry
async fn create_sale(
    State(state): State<AppState>,
    RequireCapability(user, _): RequireCapability<caps::Sales>,
    ApiJson(input): ApiJson<NewSale>,
) -> ApiResult<(StatusCode, Json<Sale>)> {
    debug!(product_id = %input.product_id, quantity = input.quantity, "create_sale");
    let sale = state.db.sales().create(input.validate()?, &user).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}
