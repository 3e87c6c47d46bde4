//! # Repository Module
//!
//! Database repository implementations for DukaSmart.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  state.db.sales().create(input, &user)                         │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── create(&self, NewSale, actor)    one transaction:                 │
//! │  │     stock::adjust ─► INSERT sale ─► publish events ─► audit        │
//! │  ├── list(&self, limit)                                                │
//! │  └── recent(&self, limit)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRepository`](user::UserRepository) - Accounts, registration, employees
//! - [`CategoryRepository`](category::CategoryRepository) - Main and sub categories
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD and stock replay
//! - [`PurchaseRepository`](purchase::PurchaseRepository) - Stock intake
//! - [`SaleRepository`](sale::SaleRepository) - Sales
//! - [`StockMovementRepository`](stock_movement::StockMovementRepository) - Manual adjustments
//! - [`NotificationRepository`](notification::NotificationRepository) - Notification feed
//! - [`AuditLogRepository`](audit::AuditLogRepository) - Audit trail
//! - [`SupplierRepository`](supplier::SupplierRepository), [`CustomerRepository`](customer::CustomerRepository)
//! - [`ReportRepository`](report::ReportRepository) - Reports and dashboard
//! - [`SearchRepository`](search::SearchRepository) - Global search

pub mod audit;
pub mod category;
pub mod customer;
pub mod notification;
pub mod product;
pub mod purchase;
pub mod report;
pub mod sale;
pub mod search;
pub mod stock;
pub mod stock_movement;
pub mod supplier;
pub mod user;

use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::error::DbResult;

/// Opens a write transaction with `BEGIN IMMEDIATE`.
///
/// The write lock is taken up front, so a writer that reads before it
/// writes waits on `busy_timeout` instead of failing with SQLITE_BUSY when
/// another connection commits first. Every mutating repository method
/// starts here.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Generates a new primary key.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern and wraps
/// the term for substring matching.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rice"), "%rice%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
