//! Main and sub categories. Anyone logged in may read; admins write.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::debug;

use duka_core::{
    MainCategory, MainCategorySummary, NewMainCategory, NewSubCategory, SubCategory,
    SubCategorySummary, UpdateCategory,
};

use crate::auth::{CurrentUser, RequireAdmin};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/main", get(list_main).post(create_main))
        .route("/main/{id}", put(update_main).delete(delete_main))
        .route("/sub", get(list_sub).post(create_sub))
        .route("/sub/{id}", put(update_sub).delete(delete_sub))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategoryQuery {
    pub main_category_id: Option<String>,
}

async fn list_main(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<Json<Vec<MainCategorySummary>>> {
    Ok(Json(state.db.categories().list_main().await?))
}

async fn create_main(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(input): ApiJson<NewMainCategory>,
) -> ApiResult<(StatusCode, Json<MainCategory>)> {
    debug!(name = %input.name, "create_main_category");
    let category = state
        .db
        .categories()
        .create_main(input.validate()?, &admin)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_main(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<UpdateCategory>,
) -> ApiResult<Json<MainCategory>> {
    let category = state
        .db
        .categories()
        .update_main(&id, update.validate()?, &admin)
        .await?;
    Ok(Json(category))
}

async fn delete_main(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.categories().delete_main(&id, &admin).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/categories/sub?mainCategoryId=
async fn list_sub(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiQuery(query): ApiQuery<SubCategoryQuery>,
) -> ApiResult<Json<Vec<SubCategorySummary>>> {
    let subs = state
        .db
        .categories()
        .list_sub(query.main_category_id.as_deref().filter(|id| !id.is_empty()))
        .await?;
    Ok(Json(subs))
}

async fn create_sub(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(input): ApiJson<NewSubCategory>,
) -> ApiResult<(StatusCode, Json<SubCategory>)> {
    debug!(name = %input.name, main = %input.main_category_id, "create_sub_category");
    let category = state
        .db
        .categories()
        .create_sub(input.validate()?, &admin)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_sub(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<UpdateCategory>,
) -> ApiResult<Json<SubCategory>> {
    let category = state
        .db
        .categories()
        .update_sub(&id, update.validate()?, &admin)
        .await?;
    Ok(Json(category))
}

async fn delete_sub(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.categories().delete_sub(&id, &admin).await?;
    Ok(StatusCode::NO_CONTENT)
}
