//! Reports and the dashboard. Gated on `reports` and `dashboard`.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use duka_core::{
    DashboardStats, InventoryReport, ProductListing, SalesReport, ValidationError,
    ValidationErrors,
};

use crate::auth::{caps, RequireCapability};
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sales", get(sales_report))
        .route("/inventory", get(inventory_report))
        .route("/low-stock", get(low_stock_report))
}

pub fn dashboard_router() -> Router<AppState> {
    Router::new().route("/stats", get(dashboard_stats))
}

/// `from` / `to` accept RFC 3339 timestamps or plain `YYYY-MM-DD` dates.
/// A plain `to` date includes that whole day.
#[derive(Debug, Default, Deserialize)]
pub struct ReportRange {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl ReportRange {
    fn bounds(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let from = non_empty(&self.from).and_then(|v| errors.check(parse_bound("from", v, false)));
        let to = non_empty(&self.to).and_then(|v| errors.check(parse_bound("to", v, true)));

        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                errors.push(ValidationError::InvalidFormat {
                    field: "to".to_string(),
                    reason: "must not be before from".to_string(),
                });
            }
        }

        errors.into_result()?;
        Ok((from, to))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Parses a range bound. Exclusive upper bounds given as a date move to
/// the start of the next day.
fn parse_bound(field: &str, value: &str, upper: bool) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "expected YYYY-MM-DD or an RFC 3339 timestamp".to_string(),
        }
    })?;

    let start = date.and_time(NaiveTime::MIN).and_utc();
    Ok(if upper { start + Duration::days(1) } else { start })
}

/// GET /api/reports/sales?from=&to=
async fn sales_report(
    State(state): State<AppState>,
    _user: RequireCapability<caps::Reports>,
    ApiQuery(range): ApiQuery<ReportRange>,
) -> ApiResult<Json<SalesReport>> {
    let (from, to) = range.bounds()?;
    Ok(Json(state.db.reports().sales_report(from, to).await?))
}

async fn inventory_report(
    State(state): State<AppState>,
    _user: RequireCapability<caps::Reports>,
) -> ApiResult<Json<InventoryReport>> {
    Ok(Json(state.db.reports().inventory_report().await?))
}

async fn low_stock_report(
    State(state): State<AppState>,
    _user: RequireCapability<caps::Reports>,
) -> ApiResult<Json<Vec<ProductListing>>> {
    Ok(Json(state.db.reports().low_stock().await?))
}

/// GET /api/dashboard/stats
async fn dashboard_stats(
    State(state): State<AppState>,
    _user: RequireCapability<caps::Dashboard>,
) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(state.db.reports().dashboard_stats(Utc::now()).await?))
}
