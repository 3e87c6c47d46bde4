//! Product catalogue. Anyone logged in may read; admins write.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::debug;

use duka_core::{clamp_limit, NewProduct, Product, ProductListing, UpdateProduct};
use duka_db::ProductFilter;

use crate::auth::{CurrentUser, RequireAdmin};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/low-stock", get(low_stock))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// GET /api/products?subCategoryId=&mainCategoryId=&limit=
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub sub_category_id: Option<String>,
    pub main_category_id: Option<String>,
    pub limit: Option<i64>,
}

impl From<ProductQuery> for ProductFilter {
    fn from(q: ProductQuery) -> Self {
        ProductFilter {
            sub_category_id: q.sub_category_id.filter(|id| !id.is_empty()),
            main_category_id: q.main_category_id.filter(|id| !id.is_empty()),
            limit: clamp_limit(q.limit),
        }
    }
}

async fn list_products(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Json<Vec<ProductListing>>> {
    let filter = ProductFilter::from(query);
    Ok(Json(state.db.products().list(&filter).await?))
}

/// Products at or below their threshold, emptiest first.
async fn low_stock(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<Json<Vec<ProductListing>>> {
    Ok(Json(state.db.products().list_low_stock().await?))
}

async fn get_product(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ProductListing>> {
    Ok(Json(state.db.products().get_listing(&id).await?))
}

async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(input): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    debug!(code = %input.code, "create_product");
    let product = state
        .db
        .products()
        .create(input.validate()?, &admin)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<UpdateProduct>,
) -> ApiResult<Json<Product>> {
    debug!(id = %id, "update_product");
    let product = state
        .db
        .products()
        .update(&id, update.validate()?, &admin)
        .await?;
    Ok(Json(product))
}

/// Refused with 409 once the product has any purchase, sale or movement.
async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.products().delete(&id, &admin).await?;
    Ok(StatusCode::NO_CONTENT)
}
