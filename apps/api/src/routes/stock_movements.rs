//! Manual stock adjustments. Gated on `stock_movements`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::debug;

use duka_core::{NewStockMovement, StockMovement, StockMovementListing};

use crate::auth::{caps, RequireCapability};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::routes::ListQuery;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_movements).post(create_movement))
}

async fn list_movements(
    State(state): State<AppState>,
    _user: RequireCapability<caps::StockMovements>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<StockMovementListing>>> {
    Ok(Json(state.db.stock_movements().list(query.limit()).await?))
}

async fn create_movement(
    State(state): State<AppState>,
    RequireCapability(user, _): RequireCapability<caps::StockMovements>,
    ApiJson(input): ApiJson<NewStockMovement>,
) -> ApiResult<(StatusCode, Json<StockMovement>)> {
    debug!(
        product_id = %input.product_id,
        direction = input.direction.as_str(),
        quantity = input.quantity,
        "create_stock_movement"
    );
    let movement = state
        .db
        .stock_movements()
        .create(input.validate()?, &user)
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}
