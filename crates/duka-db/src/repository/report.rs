//! # Report Repository
//!
//! Read-only aggregates over the stock history: the sales report, the
//! inventory report and the dashboard cards. Everything is computed from
//! the stored rows at request time; nothing is cached.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use duka_core::report::{InventoryLine, ProductSalesLine};
use duka_core::{DashboardStats, InventoryReport, Money, ProductListing, SalesReport};

use crate::error::DbResult;
use crate::repository::product::ProductRepository;

/// Repository for reports and dashboard figures.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Sales per product in `[from, to)`, best sellers first. Either bound
    /// may be open.
    pub async fn sales_report(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<SalesReport> {
        debug!(?from, ?to, "Building sales report");

        let lines = sqlx::query_as::<_, ProductSalesLine>(
            r#"
            SELECT
                p.id AS product_id,
                p.code AS product_code,
                p.name AS product_name,
                COUNT(*) AS sale_count,
                SUM(s.quantity) AS units_sold,
                SUM(s.total_amount) AS total_amount
            FROM sales s
            JOIN products p ON p.id = s.product_id
            WHERE (?1 IS NULL OR s.created_at >= ?1)
              AND (?2 IS NULL OR s.created_at < ?2)
            GROUP BY p.id
            ORDER BY total_amount DESC, p.name COLLATE NOCASE
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(SalesReport::from_lines(from, to, lines))
    }

    /// Every product with its stock, value and lifetime in/out totals.
    pub async fn inventory_report(&self) -> DbResult<InventoryReport> {
        debug!("Building inventory report");

        let lines = sqlx::query_as::<_, InventoryLine>(
            r#"
            SELECT
                p.id AS product_id,
                p.code AS product_code,
                p.name AS product_name,
                s.name AS sub_category_name,
                m.name AS main_category_name,
                p.stock_quantity,
                p.low_stock_threshold,
                p.price,
                COALESCE((SELECT SUM(quantity) FROM purchases WHERE product_id = p.id), 0)
                    AS units_purchased,
                COALESCE((SELECT SUM(quantity) FROM sales WHERE product_id = p.id), 0)
                    AS units_sold
            FROM products p
            JOIN sub_categories s ON s.id = p.sub_category_id
            JOIN main_categories m ON m.id = s.main_category_id
            ORDER BY m.name COLLATE NOCASE, s.name COLLATE NOCASE, p.name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(InventoryReport::from_lines(lines))
    }

    pub async fn low_stock(&self) -> DbResult<Vec<ProductListing>> {
        ProductRepository::new(self.pool.clone()).list_low_stock().await
    }

    /// Dashboard figures as of `now`. "Today" and "this month" are UTC.
    pub async fn dashboard_stats(&self, now: DateTime<Utc>) -> DbResult<DashboardStats> {
        let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let month = today - Duration::days(i64::from(now.day0()));

        let (
            total_products,
            total_stock_units,
            low_stock_count,
            out_of_stock_count,
            sales_today,
            sales_today_count,
            sales_this_month,
            purchases_this_month,
            active_employees,
            unread_notifications,
        ): (i64, i64, i64, i64, Money, i64, Money, Money, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM products),
                (SELECT COALESCE(SUM(stock_quantity), 0) FROM products),
                (SELECT COUNT(*) FROM products WHERE stock_quantity <= low_stock_threshold),
                (SELECT COUNT(*) FROM products WHERE stock_quantity = 0),
                (SELECT COALESCE(SUM(total_amount), 0) FROM sales WHERE created_at >= ?1),
                (SELECT COUNT(*) FROM sales WHERE created_at >= ?1),
                (SELECT COALESCE(SUM(total_amount), 0) FROM sales WHERE created_at >= ?2),
                (SELECT COALESCE(SUM(total_cost), 0) FROM purchases WHERE created_at >= ?2),
                (SELECT COUNT(*) FROM users WHERE role = 'employee' AND is_active = 1),
                (SELECT COUNT(*) FROM notifications WHERE is_read = 0 AND is_dismissed = 0)
            "#,
        )
        .bind(today)
        .bind(month)
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_products,
            total_stock_units,
            low_stock_count,
            out_of_stock_count,
            sales_today,
            sales_today_count,
            sales_this_month,
            purchases_this_month,
            active_employees,
            unread_notifications,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
