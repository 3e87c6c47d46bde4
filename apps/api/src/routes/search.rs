//! GET /api/search?q=

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use duka_core::validation::validate_search_query;
use duka_core::{SearchResults, ValidationErrors};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// An empty query returns empty groups without touching the database.
pub async fn search(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<SearchResults>> {
    let term = validate_search_query(&query.q).map_err(ValidationErrors::from)?;
    if term.is_empty() {
        return Ok(Json(SearchResults::default()));
    }

    Ok(Json(state.db.search().search(&term).await?))
}
