//! # Domain Events
//!
//! What happened, and which notifications that produces.
//!
//! ## Fan-out
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Stock transaction (duka-db)                                            │
//! │      │                                                                  │
//! │      ├──► SaleRecorded / PurchaseRecorded / StockMoved                  │
//! │      └──► StockLevelChanged { before, after, threshold }                │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │            notifications_for(&event)      (pure, this module)          │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │            Vec<NewNotification>  ──► INSERT in the SAME transaction    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Threshold Rules
//! | before → after            | notification                  |
//! |---------------------------|-------------------------------|
//! | `before > 0`, `after = 0` | `out_of_stock`, action restock |
//! | `before > t >= after`     | `low_stock`, action restock   |
//! | already at/below `t`      | nothing (no repeat)           |
//! | rising                    | nothing                       |

use crate::money::Money;
use crate::types::{NotificationAction, NotificationKind, StockDirection};

// =============================================================================
// Domain Event
// =============================================================================

/// Something worth telling the shop owner about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    SaleRecorded {
        product_id: String,
        product_name: String,
        quantity: i64,
        total_amount: Money,
        sold_by: String,
    },
    PurchaseRecorded {
        product_id: String,
        product_name: String,
        quantity: i64,
        total_cost: Money,
        supplier_name: Option<String>,
    },
    StockMoved {
        product_id: String,
        product_name: String,
        direction: StockDirection,
        quantity: i64,
        reason: Option<String>,
    },
    StockLevelChanged {
        product_id: String,
        product_name: String,
        before: i64,
        after: i64,
        threshold: i64,
    },
    EmployeeAdded {
        username: String,
        full_name: String,
    },
}

/// A notification about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub product_id: Option<String>,
    pub action: Option<NotificationAction>,
}

// =============================================================================
// Fan-out
// =============================================================================

/// Maps one event to the notifications it produces. Pure.
///
/// ## Example
/// ```rust
/// use duka_core::events::{notifications_for, DomainEvent};
/// use duka_core::types::NotificationKind;
///
/// let event = DomainEvent::StockLevelChanged {
///     product_id: "p1".into(),
///     product_name: "Sugar".into(),
///     before: 12,
///     after: 4,
///     threshold: 5,
/// };
/// let out = notifications_for(&event);
/// assert_eq!(out[0].kind, NotificationKind::LowStock);
/// ```
pub fn notifications_for(event: &DomainEvent) -> Vec<NewNotification> {
    match event {
        DomainEvent::SaleRecorded {
            product_id,
            product_name,
            quantity,
            total_amount,
            sold_by,
        } => vec![NewNotification {
            kind: NotificationKind::NewSale,
            title: "New sale".to_string(),
            message: format!(
                "{} sold {} × {} for {}",
                sold_by, quantity, product_name, total_amount
            ),
            product_id: Some(product_id.clone()),
            action: None,
        }],

        DomainEvent::PurchaseRecorded {
            product_id,
            product_name,
            quantity,
            total_cost,
            supplier_name,
        } => {
            let from = supplier_name
                .as_deref()
                .map(|s| format!(" from {}", s))
                .unwrap_or_default();
            vec![NewNotification {
                kind: NotificationKind::NewPurchase,
                title: "New purchase".to_string(),
                message: format!(
                    "Received {} × {}{} for {}",
                    quantity, product_name, from, total_cost
                ),
                product_id: Some(product_id.clone()),
                action: None,
            }]
        }

        DomainEvent::StockMoved {
            product_id,
            product_name,
            direction,
            quantity,
            reason,
        } => {
            let verb = match direction {
                StockDirection::In => "added to",
                StockDirection::Out => "removed from",
            };
            let why = reason
                .as_deref()
                .map(|r| format!(" ({})", r))
                .unwrap_or_default();
            vec![NewNotification {
                kind: NotificationKind::StockMovement,
                title: "Stock adjusted".to_string(),
                message: format!("{} units {} {}{}", quantity, verb, product_name, why),
                product_id: Some(product_id.clone()),
                action: None,
            }]
        }

        DomainEvent::StockLevelChanged {
            product_id,
            product_name,
            before,
            after,
            threshold,
        } => threshold_crossing(product_id, product_name, *before, *after, *threshold)
            .into_iter()
            .collect(),

        DomainEvent::EmployeeAdded {
            username,
            full_name,
        } => vec![NewNotification {
            kind: NotificationKind::EmployeeAdded,
            title: "Employee added".to_string(),
            message: format!("{} ({}) can now sign in", full_name, username),
            product_id: None,
            action: None,
        }],
    }
}

fn threshold_crossing(
    product_id: &str,
    product_name: &str,
    before: i64,
    after: i64,
    threshold: i64,
) -> Option<NewNotification> {
    if after == 0 && before > 0 {
        return Some(NewNotification {
            kind: NotificationKind::OutOfStock,
            title: "Out of stock".to_string(),
            message: format!("{} is out of stock", product_name),
            product_id: Some(product_id.to_string()),
            action: Some(NotificationAction::Restock),
        });
    }

    if before > threshold && after <= threshold {
        return Some(NewNotification {
            kind: NotificationKind::LowStock,
            title: "Low stock".to_string(),
            message: format!(
                "{} is down to {} (threshold {})",
                product_name, after, threshold
            ),
            product_id: Some(product_id.to_string()),
            action: Some(NotificationAction::Restock),
        });
    }

    None
}

/// Fans out several events in order.
pub fn notifications_for_all<'a, I>(events: I) -> Vec<NewNotification>
where
    I: IntoIterator<Item = &'a DomainEvent>,
{
    events.into_iter().flat_map(notifications_for).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
