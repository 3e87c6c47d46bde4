//! # Domain Types
//!
//! Core domain types used throughout DukaSmart.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  MainCategory ──1:N──► SubCategory ──1:N──► Product                    │
//! │                                               │                         │
//! │                     ┌─────────────────────────┼───────────────────┐     │
//! │                     ▼                         ▼                   ▼     │
//! │                 Purchase (+)              Sale (−)      StockMovement (±)│
//! │                 immutable                 immutable      immutable      │
//! │                                                                         │
//! │  User (admin | employee + Capabilities)                                │
//! │  Notification (read / dismissed)   AuditLog (immutable)                │
//! │  Supplier, Customer (reference lists)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Every type serializes with camelCase field names; money is integer cents
//! and timestamps are RFC 3339 strings.
//!
//! ## Stock Invariant
//! `Product::stock_quantity` is never written directly. It changes only
//! inside a Purchase, Sale or StockMovement transaction, so replaying the
//! history from zero always reproduces the stored value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::permission::{role_allows, Capabilities, Capability, Role};

// =============================================================================
// User
// =============================================================================

/// A person who can log in.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,

    /// Argon2id PHC string. Never leaves the server.
    #[serde(skip)]
    #[ts(skip)]
    pub password_hash: String,

    pub role: Role,

    /// Only meaningful for employees.
    #[ts(as = "Vec<Capability>")]
    pub permissions: Capabilities,

    /// Disabled users cannot log in and lose their sessions.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this user may use `cap`. Admins always may.
    #[inline]
    pub fn can(&self, cap: Capability) -> bool {
        role_allows(self.role, self.permissions, cap)
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The capabilities this user effectively holds.
    pub fn effective_permissions(&self) -> Capabilities {
        match self.role {
            Role::Admin => Capabilities::all(),
            Role::Employee => self.permissions,
        }
    }
}

/// Input for creating an employee account (admin only).
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    pub username: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    #[ts(as = "Vec<Capability>")]
    pub permissions: Capabilities,
}

/// Partial update of an employee. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployee {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[ts(as = "Option<Vec<Capability>>")]
    pub permissions: Option<Capabilities>,
    pub is_active: Option<bool>,
}

// =============================================================================
// Categories
// =============================================================================

/// Top level of the two-level taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MainCategory {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A main category with its live counts, as listed to the client.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MainCategorySummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub sub_category_count: i64,
    /// Products across all sub-categories.
    pub product_count: i64,
}

/// Second level of the taxonomy. Belongs to exactly one main category.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    pub id: String,
    pub main_category_id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SubCategorySummary {
    pub id: String,
    pub main_category_id: String,
    pub main_category_name: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub product_count: i64,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewMainCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewSubCategory {
    pub main_category_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Rename or re-describe a category. Used for both levels.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub description: Option<String>,
}

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business identifier, unique.
    pub code: String,

    pub name: String,
    pub description: Option<String>,
    pub sub_category_id: String,

    /// Default selling price.
    pub price: Money,

    /// Units on hand. Never negative.
    pub stock_quantity: i64,

    /// At or below this level the product counts as low stock.
    pub low_stock_threshold: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.low_stock_threshold
    }

    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }

    /// Value of the units on hand at the selling price.
    pub fn stock_value(&self) -> Money {
        self.price
            .multiply_quantity(self.stock_quantity)
            .unwrap_or(Money::from_cents(i64::MAX))
    }
}

/// A product joined with its category names, as listed to the client.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    pub id: String,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub sub_category_id: String,
    pub sub_category_name: String,
    pub main_category_id: String,
    pub main_category_name: String,
    pub price: Money,
    pub stock_quantity: i64,
    pub low_stock_threshold: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product.
///
/// There is no stock field: a new product starts at zero and is stocked
/// through purchases.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub sub_category_id: String,
    pub price: Money,
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

fn default_low_stock_threshold() -> i64 {
    crate::DEFAULT_LOW_STOCK_THRESHOLD
}

/// Partial product update. Stock is deliberately absent.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub sub_category_id: Option<String>,
    pub price: Option<Money>,
    pub low_stock_threshold: Option<i64>,
}

// =============================================================================
// Purchase
// =============================================================================

/// Stock received from a supplier. Immutable; one row per intake so the
/// cost history is preserved.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    pub cost_per_unit: Money,
    /// `quantity × cost_per_unit`.
    pub total_cost: Money,
    pub supplier_name: Option<String>,
    pub purchased_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseListing {
    pub id: String,
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub quantity: i64,
    pub cost_per_unit: Money,
    pub total_cost: Money,
    pub supplier_name: Option<String>,
    pub purchased_by: String,
    pub purchased_by_name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewPurchase {
    pub product_id: String,
    pub quantity: i64,
    pub cost_per_unit: Money,
    #[serde(default)]
    pub supplier_name: Option<String>,
}

// =============================================================================
// Sale
// =============================================================================

/// A recorded sale. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price actually charged.
    pub sale_price: Money,
    /// `quantity × sale_price`.
    pub total_amount: Money,
    pub customer_name: Option<String>,
    pub sold_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleListing {
    pub id: String,
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub quantity: i64,
    pub sale_price: Money,
    pub total_amount: Money,
    pub customer_name: Option<String>,
    pub sold_by: String,
    pub sold_by_name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for recording a sale. `sale_price` defaults to the product's price.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub sale_price: Option<Money>,
    #[serde(default)]
    pub customer_name: Option<String>,
}

// =============================================================================
// Stock Movement
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum StockDirection {
    In,
    Out,
}

impl StockDirection {
    /// Signed change applied to stock for `quantity` units.
    #[inline]
    pub const fn signed(&self, quantity: i64) -> i64 {
        match self {
            StockDirection::In => quantity,
            StockDirection::Out => -quantity,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            StockDirection::In => "in",
            StockDirection::Out => "out",
        }
    }
}

/// A manual stock adjustment (damage, count correction, transfer). Immutable.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub direction: StockDirection,
    pub quantity: i64,
    pub reason: Option<String>,
    pub performed_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockMovementListing {
    pub id: String,
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub direction: StockDirection,
    pub quantity: i64,
    pub reason: Option<String>,
    pub performed_by: String,
    pub performed_by_name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewStockMovement {
    pub product_id: String,
    pub direction: StockDirection,
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

// =============================================================================
// Notification
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LowStock,
    OutOfStock,
    NewSale,
    NewPurchase,
    StockMovement,
    EmployeeAdded,
}

/// The follow-up a notification suggests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    Restock,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub product_id: Option<String>,
    pub action: Option<NotificationAction>,
    pub is_read: bool,
    pub is_dismissed: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Suppliers & Customers
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input shared by suppliers and customers.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

// =============================================================================
// Audit Log
// =============================================================================

/// Who did what to which entity. Written in the same transaction as the
/// change it describes; never updated.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: String,
    pub user_id: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// An audit entry about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditLog {
    pub user_id: Option<String>,
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: Option<String>,
    pub details: Option<String>,
}

impl NewAuditLog {
    pub fn new(user_id: impl Into<String>, action: &'static str, entity_type: &'static str) -> Self {
        Self {
            user_id: Some(user_id.into()),
            action,
            entity_type,
            entity_id: None,
            details: None,
        }
    }

    pub fn entity(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

// =============================================================================
// Search
// =============================================================================

/// Grouped hits of the global search box.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub products: Vec<ProductListing>,
    pub main_categories: Vec<MainCategory>,
    pub sub_categories: Vec<SubCategory>,
    pub suppliers: Vec<Supplier>,
    pub customers: Vec<Customer>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
            && self.main_categories.is_empty()
            && self.sub_categories.is_empty()
            && self.suppliers.is_empty()
            && self.customers.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
