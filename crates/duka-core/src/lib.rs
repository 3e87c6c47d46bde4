//! # duka-core: Pure Business Logic for DukaSmart
//!
//! The domain model of the DukaSmart inventory backend, as pure types and
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        DukaSmart Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web client (browser)                         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP + session cookie        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  │    extractors: CurrentUser, RequireAdmin, RequireCapability     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ duka-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  types   │ │  money   │ │permission│ │ events           │  │   │
//! │  │   │ Product  │ │  Money   │ │ Role     │ │ DomainEvent      │  │   │
//! │  │   │ Sale ... │ │          │ │Capability│ │ notifications_for│  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐                       │   │
//! │  │   │validation│ │  report  │ │  error   │                       │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘                       │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    duka-db (Database Layer)                     │   │
//! │  │       SQLite, migrations, repositories, stock transactions      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities and request inputs
//! - [`money`] - Integer money (cents)
//! - [`permission`] - Roles and the capability bitset
//! - [`events`] - Domain events and notification fan-out
//! - [`validation`] - Field and request validation
//! - [`report`] - Report and dashboard shapes
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use duka_core::{Capabilities, Capability, Money};
//!
//! let total = Money::from_major_minor(500, 0).multiply_quantity(5).unwrap();
//! assert_eq!(total.to_string(), "2500.00");
//!
//! let clerk = Capabilities::from_iter([Capability::Sales]);
//! assert!(!clerk.contains(Capability::Reports));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod events;
pub mod money;
pub mod permission;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError, ValidationErrors};
pub use events::{notifications_for, DomainEvent, NewNotification};
pub use money::Money;
pub use permission::{Capabilities, Capability, Role};
pub use report::{DashboardStats, InventoryReport, SalesReport};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest quantity accepted on a single purchase, sale or movement.
pub const MAX_QUANTITY: i64 = 1_000_000;

/// Low-stock threshold used when a new product does not specify one.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

pub const MAX_CODE_LEN: usize = 50;
pub const MAX_NAME_LEN: usize = 200;
pub const MAX_TEXT_LEN: usize = 1000;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Rows returned by list endpoints when the client does not ask for a limit.
pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Upper bound on any requested list limit.
pub const MAX_LIST_LIMIT: i64 = 1000;

/// Hits per group in global search.
pub const SEARCH_LIMIT: i64 = 10;

/// Clamps a client-supplied list limit into `1..=MAX_LIST_LIMIT`.
///
/// ```rust
/// assert_eq!(duka_core::clamp_limit(None), duka_core::DEFAULT_LIST_LIMIT);
/// assert_eq!(duka_core::clamp_limit(Some(0)), 1);
/// assert_eq!(duka_core::clamp_limit(Some(1_000_000)), duka_core::MAX_LIST_LIMIT);
/// ```
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}
