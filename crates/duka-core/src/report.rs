//! # Report Types
//!
//! Shapes of the dashboard and report responses. The numbers are computed in
//! SQL by duka-db; this module only defines what comes back and the small
//! amount of arithmetic that is easier to do in Rust.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Sales Report
// =============================================================================

/// Sales grouped by product within a date window.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
    pub sale_count: i64,
    pub units_sold: i64,
    pub total_amount: Money,
    pub by_product: Vec<ProductSalesLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductSalesLine {
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub sale_count: i64,
    pub units_sold: i64,
    pub total_amount: Money,
}

impl SalesReport {
    /// Builds the report totals from its lines.
    pub fn from_lines(
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        by_product: Vec<ProductSalesLine>,
    ) -> Self {
        Self {
            from,
            to,
            sale_count: by_product.iter().map(|l| l.sale_count).sum(),
            units_sold: by_product.iter().map(|l| l.units_sold).sum(),
            total_amount: by_product.iter().map(|l| l.total_amount).sum(),
            by_product,
        }
    }
}

// =============================================================================
// Inventory Report
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLine {
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub sub_category_name: String,
    pub main_category_name: String,
    pub stock_quantity: i64,
    pub low_stock_threshold: i64,
    pub price: Money,
    pub units_purchased: i64,
    pub units_sold: i64,
}

impl InventoryLine {
    pub fn stock_value(&self) -> Money {
        self.price
            .multiply_quantity(self.stock_quantity)
            .unwrap_or(Money::from_cents(i64::MAX))
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.low_stock_threshold
    }
}

/// Current stock of every product with its value at selling price.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReport {
    pub product_count: i64,
    pub total_units: i64,
    pub total_stock_value: Money,
    pub low_stock_count: i64,
    pub items: Vec<InventoryLine>,
}

impl InventoryReport {
    pub fn from_lines(items: Vec<InventoryLine>) -> Self {
        Self {
            product_count: items.len() as i64,
            total_units: items.iter().map(|l| l.stock_quantity).sum(),
            total_stock_value: items.iter().map(InventoryLine::stock_value).sum(),
            low_stock_count: items.iter().filter(|l| l.is_low_stock()).count() as i64,
            items,
        }
    }
}

// =============================================================================
// Dashboard
// =============================================================================

/// Headline numbers for the dashboard cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: i64,
    pub total_stock_units: i64,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
    pub sales_today: Money,
    pub sales_today_count: i64,
    pub sales_this_month: Money,
    pub purchases_this_month: Money,
    pub active_employees: i64,
    pub unread_notifications: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: i64, threshold: i64, price: i64) -> InventoryLine {
        InventoryLine {
            product_id: "p".to_string(),
            product_code: "P".to_string(),
            product_name: "P".to_string(),
            sub_category_name: "S".to_string(),
            main_category_name: "M".to_string(),
            stock_quantity: qty,
            low_stock_threshold: threshold,
            price: Money::from_cents(price),
            units_purchased: qty,
            units_sold: 0,
        }
    }

    #[test]
    fn test_inventory_totals() {
        let report = InventoryReport::from_lines(vec![line(10, 5, 100), line(2, 5, 1000)]);
        assert_eq!(report.product_count, 2);
        assert_eq!(report.total_units, 12);
        assert_eq!(report.total_stock_value, Money::from_cents(3000));
        assert_eq!(report.low_stock_count, 1);
    }

    #[test]
    fn test_sales_totals() {
        let lines = vec![
            ProductSalesLine {
                product_id: "a".to_string(),
                product_code: "A".to_string(),
                product_name: "A".to_string(),
                sale_count: 2,
                units_sold: 7,
                total_amount: Money::from_cents(3500),
            },
            ProductSalesLine {
                product_id: "b".to_string(),
                product_code: "B".to_string(),
                product_name: "B".to_string(),
                sale_count: 1,
                units_sold: 1,
                total_amount: Money::from_cents(250),
            },
        ];
        let report = SalesReport::from_lines(None, None, lines);
        assert_eq!(report.sale_count, 3);
        assert_eq!(report.units_sold, 8);
        assert_eq!(report.total_amount.cents(), 3750);
    }

    #[test]
    fn test_empty_reports() {
        let report = InventoryReport::from_lines(Vec::new());
        assert_eq!(report.total_stock_value, Money::zero());
        assert_eq!(SalesReport::from_lines(None, None, Vec::new()).sale_count, 0);
    }
}
