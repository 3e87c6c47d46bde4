//! REST routes, one module per resource.
//!
//! Handlers stay thin: extract and gate, validate the input, call one
//! repository method, wrap the result in JSON.

use serde::Deserialize;

pub mod audit;
pub mod auth;
pub mod categories;
pub mod contacts;
pub mod employees;
pub mod health;
pub mod notifications;
pub mod products;
pub mod purchases;
pub mod reports;
pub mod sales;
pub mod search;
pub mod stock_movements;

/// `?limit=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn limit(&self) -> i64 {
        duka_core::clamp_limit(self.limit)
    }
}
