//! # Roles and Capabilities
//!
//! The permission model for DukaSmart.
//!
//! ## Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Who may do what                                    │
//! │                                                                         │
//! │  Role::Admin     ──► every capability, always (stored set is ignored)  │
//! │                                                                         │
//! │  Role::Employee  ──► exactly the capabilities in `Capabilities`        │
//! │                                                                         │
//! │  Capabilities is a u32 bitset over the closed `Capability` enum:       │
//! │                                                                         │
//! │    bit 0  dashboard                                                     │
//! │    bit 1  purchases                                                     │
//! │    bit 2  sales                                                         │
//! │    bit 3  stock_movements                                               │
//! │    bit 4  reports                                                       │
//! │                                                                         │
//! │  On the wire: ["sales", "reports"]  (unknown names are rejected)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Role
// =============================================================================

/// A user's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Owner/manager: implicitly holds every capability.
    Admin,
    /// Staff member limited to the capabilities granted by an admin.
    Employee,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }
}

// =============================================================================
// Capability
// =============================================================================

/// A single grantable permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[ts(export)]
#[ts(rename_all = "snake_case")]
pub enum Capability {
    Dashboard,
    Purchases,
    Sales,
    StockMovements,
    Reports,
}

impl Capability {
    /// Every capability, in bit order.
    pub const ALL: [Capability; 5] = [
        Capability::Dashboard,
        Capability::Purchases,
        Capability::Sales,
        Capability::StockMovements,
        Capability::Reports,
    ];

    #[inline]
    const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Capability::Dashboard => "dashboard",
            Capability::Purchases => "purchases",
            Capability::Sales => "sales",
            Capability::StockMovements => "stock_movements",
            Capability::Reports => "reports",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "permissions".to_string(),
                allowed: Capability::ALL.iter().map(|c| c.as_str().to_string()).collect(),
            })
    }
}

impl Serialize for Capability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Capability {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Capabilities (bitset)
// =============================================================================

/// A set of capabilities stored as a bitset.
///
/// ## Example
/// ```rust
/// use duka_core::permission::{Capabilities, Capability};
///
/// let caps = Capabilities::from_iter([Capability::Sales, Capability::Reports]);
/// assert!(caps.contains(Capability::Sales));
/// assert!(!caps.contains(Capability::Purchases));
/// ```
/// Exported to TypeScript as `Capability[]` at each field that uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Capabilities(u32);

impl Capabilities {
    /// The empty set.
    #[inline]
    pub const fn empty() -> Self {
        Capabilities(0)
    }

    /// Every capability.
    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    /// Rebuilds a set from its stored bits, discarding bits that no longer
    /// map to a capability.
    pub fn from_bits_truncate(bits: u32) -> Self {
        Capabilities(bits & Capabilities::all().0)
    }

    #[inline]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(&self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    #[inline]
    pub fn insert(&mut self, cap: Capability) {
        self.0 |= cap.bit();
    }

    #[inline]
    pub fn remove(&mut self, cap: Capability) {
        self.0 &= !cap.bit();
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates the contained capabilities in bit order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.contains(*c))
    }

    /// Parses a list of permission names, collecting every unknown one.
    pub fn parse_names<I, S>(names: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut caps = Capabilities::empty();
        for name in names {
            caps.insert(name.as_ref().parse()?);
        }
        Ok(caps)
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        let mut caps = Capabilities::empty();
        for cap in iter {
            caps.insert(cap);
        }
        caps
    }
}

impl Serialize for Capabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for Capabilities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let caps = Vec::<Capability>::deserialize(deserializer)?;
        Ok(caps.into_iter().collect())
    }
}

/// Checks whether a principal with the given role and stored capabilities
/// may use `cap`. Admins pass regardless of what is stored.
#[inline]
pub fn role_allows(role: Role, stored: Capabilities, cap: Capability) -> bool {
    match role {
        Role::Admin => true,
        Role::Employee => stored.contains(cap),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_passes_with_empty_set() {
        for cap in Capability::ALL {
            assert!(role_allows(Role::Admin, Capabilities::empty(), cap));
        }
    }

    #[test]
    fn test_employee_needs_capability() {
        let caps = Capabilities::from_iter([Capability::Purchases]);
        assert!(role_allows(Role::Employee, caps, Capability::Purchases));
        assert!(!role_allows(Role::Employee, caps, Capability::Sales));
    }

    #[test]
    fn test_serde_as_names() {
        let caps = Capabilities::from_iter([Capability::Reports, Capability::Sales]);
        let json = serde_json::to_string(&caps).unwrap();
        assert_eq!(json, r#"["sales","reports"]"#);

        let back: Capabilities = serde_json::from_str(r#"["stock_movements","sales"]"#).unwrap();
        assert!(back.contains(Capability::StockMovements));
        assert!(back.contains(Capability::Sales));
        assert!(!back.contains(Capability::Dashboard));
    }

    #[test]
    fn test_unknown_name_rejected() {
        assert!(serde_json::from_str::<Capabilities>(r#"["sales","delete_everything"]"#).is_err());
        assert!(Capabilities::parse_names(["sale"]).is_err());
    }

    #[test]
    fn test_bits_truncate_drops_unknown_bits() {
        let caps = Capabilities::from_bits_truncate(0xFFFF_FFFF);
        assert_eq!(caps, Capabilities::all());
    }

    #[test]
    fn test_insert_remove() {
        let mut caps = Capabilities::empty();
        caps.insert(Capability::Dashboard);
        caps.insert(Capability::Dashboard);
        assert_eq!(caps.iter().count(), 1);
        caps.remove(Capability::Dashboard);
        assert!(caps.is_empty());
    }
}
