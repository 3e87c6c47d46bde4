//! Stock intake. Gated on the `purchases` capability.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::debug;

use duka_core::{NewPurchase, Purchase, PurchaseListing};

use crate::auth::{caps, RequireCapability};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::routes::ListQuery;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_purchases).post(create_purchase))
}

async fn list_purchases(
    State(state): State<AppState>,
    _user: RequireCapability<caps::Purchases>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<PurchaseListing>>> {
    Ok(Json(state.db.purchases().list(query.limit()).await?))
}

/// POST /api/purchases
///
/// Adds stock and records the purchase in one transaction.
async fn create_purchase(
    State(state): State<AppState>,
    RequireCapability(user, _): RequireCapability<caps::Purchases>,
    ApiJson(input): ApiJson<NewPurchase>,
) -> ApiResult<(StatusCode, Json<Purchase>)> {
    debug!(product_id = %input.product_id, quantity = input.quantity, "create_purchase");
    let purchase = state
        .db
        .purchases()
        .create(input.validate()?, &user)
        .await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}
