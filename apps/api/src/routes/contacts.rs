//! Supplier and customer reference lists for the purchase and sale forms.
//!
//! Suppliers follow the `purchases` capability and customers the `sales`
//! capability. Both lists also grow on their own when a purchase or sale
//! names someone new.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use duka_core::{Customer, NewContact, Supplier};

use crate::auth::{caps, RequireCapability};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn suppliers() -> Router<AppState> {
    Router::new().route("/", get(list_suppliers).post(create_supplier))
}

pub fn customers() -> Router<AppState> {
    Router::new().route("/", get(list_customers).post(create_customer))
}

async fn list_suppliers(
    State(state): State<AppState>,
    _user: RequireCapability<caps::Purchases>,
) -> ApiResult<Json<Vec<Supplier>>> {
    Ok(Json(state.db.suppliers().list().await?))
}

async fn create_supplier(
    State(state): State<AppState>,
    RequireCapability(user, _): RequireCapability<caps::Purchases>,
    ApiJson(input): ApiJson<NewContact>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    let supplier = state
        .db
        .suppliers()
        .create(input.validate()?, &user)
        .await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

async fn list_customers(
    State(state): State<AppState>,
    _user: RequireCapability<caps::Sales>,
) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.db.customers().list().await?))
}

async fn create_customer(
    State(state): State<AppState>,
    RequireCapability(user, _): RequireCapability<caps::Sales>,
    ApiJson(input): ApiJson<NewContact>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = state
        .db
        .customers()
        .create(input.validate()?, &user)
        .await?;
    Ok((StatusCode::CREATED, Json(customer)))
}
