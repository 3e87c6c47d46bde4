//! # Error Types
//!
//! Domain-specific error types for duka-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  duka-core errors (this file)                                          │
//! │  ├── CoreError         - Domain rule violations                        │
//! │  ├── ValidationError   - One invalid field                             │
//! │  └── ValidationErrors  - Every invalid field of one request            │
//! │                                                                         │
//! │  duka-db errors (separate crate)                                       │
//! │  └── DbError           - Database operation failures                   │
//! │                                                                         │
//! │  HTTP errors (apps/api)                                                │
//! │  └── ApiError          - What the web client sees (JSON)               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Not enough stock to complete a sale or outbound movement.
    ///
    /// ## When This Occurs
    /// ```text
    /// POST /api/sales { quantity: 5 }
    ///      │
    ///      ▼
    /// UPDATE ... WHERE stock_quantity >= 5   → 0 rows
    ///      │
    ///      ▼
    /// InsufficientStock { code: "P-001", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// 422 INSUFFICIENT_STOCK, nothing written
    /// ```
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    /// One or more request fields failed validation.
    #[error("{0}")]
    Invalid(#[from] ValidationErrors),
}

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        CoreError::Invalid(ValidationErrors::from(err))
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors. Every variant names the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {}", allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// The request field this error refers to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}

// =============================================================================
// Validation Errors (collection)
// =============================================================================

/// Every field violation found in one request.
///
/// Validators push into this instead of returning on the first failure, so
/// the client can highlight all bad fields at once.
///
/// ## Example
/// ```rust
/// use duka_core::error::{ValidationError, ValidationErrors};
///
/// let mut errors = ValidationErrors::new();
/// errors.push(ValidationError::Required { field: "name".into() });
/// errors.push(ValidationError::MustBePositive { field: "quantity".into() });
/// assert_eq!(errors.len(), 2);
/// assert!(errors.into_result().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: ValidationError) {
        self.0.push(err);
    }

    /// Records the error of a validator result, if any, and returns the
    /// value on success.
    pub fn check<T>(&mut self, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.push(e);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(err: ValidationError) -> Self {
        ValidationErrors(vec![err])
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "Validation failed: {}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            code: "P-001".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for P-001: available 3, requested 5"
        );
    }

    #[test]
    fn test_field_accessor() {
        let err = ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: 10,
        };
        assert_eq!(err.field(), "quantity");
        assert_eq!(err.to_string(), "quantity must be between 1 and 10");
    }

    #[test]
    fn test_not_allowed_lists_options() {
        let err = ValidationError::NotAllowed {
            field: "direction".to_string(),
            allowed: vec!["in".to_string(), "out".to_string()],
        };
        assert_eq!(err.to_string(), "direction must be one of: in, out");
    }

    #[test]
    fn test_collects_every_error() {
        let mut errors = ValidationErrors::new();
        assert_eq!(errors.check(Ok::<_, ValidationError>(5)), Some(5));
        assert_eq!(
            errors.check::<()>(Err(ValidationError::Required { field: "code".into() })),
            None
        );
        errors.push(ValidationError::Required { field: "name".into() });

        let err = errors.into_result().unwrap_err();
        let fields: Vec<&str> = err.iter().map(|e| e.field()).collect();
        assert_eq!(fields, vec!["code", "name"]);
    }

    #[test]
    fn test_single_validation_error_converts_to_core_error() {
        let core: CoreError = ValidationError::Required { field: "name".into() }.into();
        assert!(matches!(core, CoreError::Invalid(ref e) if e.len() == 1));
    }
}
