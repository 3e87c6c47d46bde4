//! # Validation Module
//!
//! Input validation for every DukaSmart request body.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: JSON extraction (axum)                                       │
//! │  └── Shape and types; failures become VALIDATION_ERROR                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Field validators: validate_code, validate_quantity, ...          │
//! │  └── Request validators: NewProduct::validate, NewSale::validate, ... │
//! │      collect EVERY bad field into ValidationErrors                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── UNIQUE / FOREIGN KEY constraints                                  │
//! │  └── CHECK (stock_quantity >= 0)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Request validators consume the input and hand back a normalized copy
//! (trimmed strings, empty optionals turned into `None`).
//!
//! ## Usage
//! ```rust
//! use duka_core::validation::{validate_code, validate_quantity};
//!
//! assert_eq!(validate_code("code", "  P-001 ").unwrap(), "P-001");
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::{ValidationError, ValidationErrors};
use crate::money::Money;
use crate::types::{
    NewContact, NewEmployee, NewMainCategory, NewProduct, NewPurchase, NewSale, NewStockMovement,
    NewSubCategory, UpdateCategory, UpdateEmployee, UpdateProduct,
};
use crate::{MAX_CODE_LEN, MAX_NAME_LEN, MAX_QUANTITY, MAX_TEXT_LEN, MIN_PASSWORD_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a business code (product code).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, numbers, hyphens and underscores only
///
/// ## Returns
/// The trimmed code.
pub fn validate_code(field: &str, code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if code.chars().count() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(code.to_string())
}

/// Validates a required display name (products, categories, people).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

/// Validates an optional free-text field. Blank text becomes `None`.
pub fn validate_optional_text(
    field: &str,
    text: Option<&str>,
    max: usize,
) -> ValidationResult<Option<String>> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    if text.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(Some(text.to_string()))
}

/// Validates a login name.
///
/// ## Rules
/// - 3 to 50 characters
/// - Letters, numbers, dots, hyphens and underscores
pub fn validate_username(username: &str) -> ValidationResult<String> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }

    if username.chars().count() < 3 {
        return Err(ValidationError::TooShort {
            field: "username".to_string(),
            min: 3,
        });
    }

    if username.chars().count() > 50 {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: 50,
        });
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters, numbers, dots, hyphens, and underscores"
                .to_string(),
        });
    }

    Ok(username.to_string())
}

/// Validates a new password. Not trimmed.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }

    if password.len() > 256 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 256,
        });
    }

    Ok(())
}

/// Validates an optional e-mail address. Only the basic shape is checked.
pub fn validate_email(email: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(email) = validate_optional_text("email", email, MAX_NAME_LEN)? else {
        return Ok(None);
    };

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(Some(email)),
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must be a valid email address".to_string(),
        }),
    }
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (no results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "q".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity on a purchase, sale or stock movement.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<i64> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_QUANTITY,
        });
    }

    Ok(qty)
}

/// Validates a money amount. Zero is allowed (free items, donated stock).
///
/// ## Example
/// ```rust
/// use duka_core::money::Money;
/// use duka_core::validation::validate_money;
///
/// assert!(validate_money("price", Money::from_cents(0)).is_ok());
/// assert!(validate_money("price", Money::from_cents(-1)).is_err());
/// ```
pub fn validate_money(field: &str, amount: Money) -> ValidationResult<Money> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(amount)
}

/// Validates a low-stock threshold.
pub fn validate_threshold(threshold: i64) -> ValidationResult<i64> {
    if !(0..=MAX_QUANTITY).contains(&threshold) {
        return Err(ValidationError::OutOfRange {
            field: "lowStockThreshold".to_string(),
            min: 0,
            max: MAX_QUANTITY,
        });
    }

    Ok(threshold)
}

/// Checks that `unit × quantity` fits, returning the total.
pub fn validate_total(field: &str, unit: Money, quantity: i64) -> ValidationResult<Money> {
    unit.multiply_quantity(quantity)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        })
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID reference.
///
/// ## Example
/// ```rust
/// use duka_core::validation::validate_uuid;
///
/// assert!(validate_uuid("productId", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("productId", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<String> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(id.to_string())
}

// =============================================================================
// Request Validators
// =============================================================================

impl NewMainCategory {
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = errors.check(validate_name("name", &self.name));
        let description = errors.check(validate_optional_text(
            "description",
            self.description.as_deref(),
            MAX_TEXT_LEN,
        ));
        errors.into_result()?;

        Ok(Self {
            name: name.unwrap_or_default(),
            description: description.flatten(),
        })
    }
}

impl NewSubCategory {
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let main_category_id = errors.check(validate_uuid("mainCategoryId", &self.main_category_id));
        let name = errors.check(validate_name("name", &self.name));
        let description = errors.check(validate_optional_text(
            "description",
            self.description.as_deref(),
            MAX_TEXT_LEN,
        ));
        errors.into_result()?;

        Ok(Self {
            main_category_id: main_category_id.unwrap_or_default(),
            name: name.unwrap_or_default(),
            description: description.flatten(),
        })
    }
}

impl UpdateCategory {
    /// A present but blank description clears it (`Some(None)` downstream
    /// is represented as `Some("")`).
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = match self.name.as_deref() {
            Some(n) => errors.check(validate_name("name", n)),
            None => None,
        };
        let description = match self.description.as_deref() {
            Some(d) => errors
                .check(validate_optional_text("description", Some(d), MAX_TEXT_LEN))
                .map(Option::unwrap_or_default),
            None => None,
        };
        errors.into_result()?;

        Ok(Self { name, description })
    }
}

impl NewProduct {
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let code = errors.check(validate_code("code", &self.code));
        let name = errors.check(validate_name("name", &self.name));
        let description = errors.check(validate_optional_text(
            "description",
            self.description.as_deref(),
            MAX_TEXT_LEN,
        ));
        let sub_category_id = errors.check(validate_uuid("subCategoryId", &self.sub_category_id));
        errors.check(validate_money("price", self.price));
        errors.check(validate_threshold(self.low_stock_threshold));
        errors.into_result()?;

        Ok(Self {
            code: code.unwrap_or_default(),
            name: name.unwrap_or_default(),
            description: description.flatten(),
            sub_category_id: sub_category_id.unwrap_or_default(),
            price: self.price,
            low_stock_threshold: self.low_stock_threshold,
        })
    }
}

impl UpdateProduct {
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let code = match self.code.as_deref() {
            Some(c) => errors.check(validate_code("code", c)),
            None => None,
        };
        let name = match self.name.as_deref() {
            Some(n) => errors.check(validate_name("name", n)),
            None => None,
        };
        let description = match self.description.as_deref() {
            Some(d) => errors
                .check(validate_optional_text("description", Some(d), MAX_TEXT_LEN))
                .map(Option::unwrap_or_default),
            None => None,
        };
        let sub_category_id = match self.sub_category_id.as_deref() {
            Some(id) => errors.check(validate_uuid("subCategoryId", id)),
            None => None,
        };
        if let Some(price) = self.price {
            errors.check(validate_money("price", price));
        }
        if let Some(threshold) = self.low_stock_threshold {
            errors.check(validate_threshold(threshold));
        }
        errors.into_result()?;

        Ok(Self {
            code,
            name,
            description,
            sub_category_id,
            price: self.price,
            low_stock_threshold: self.low_stock_threshold,
        })
    }
}

impl NewPurchase {
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let product_id = errors.check(validate_uuid("productId", &self.product_id));
        let quantity = errors.check(validate_quantity(self.quantity));
        let cost = errors.check(validate_money("costPerUnit", self.cost_per_unit));
        if let (Some(q), Some(c)) = (quantity, cost) {
            errors.check(validate_total("costPerUnit", c, q));
        }
        let supplier_name = errors.check(validate_optional_text(
            "supplierName",
            self.supplier_name.as_deref(),
            MAX_NAME_LEN,
        ));
        errors.into_result()?;

        Ok(Self {
            product_id: product_id.unwrap_or_default(),
            quantity: self.quantity,
            cost_per_unit: self.cost_per_unit,
            supplier_name: supplier_name.flatten(),
        })
    }
}

impl NewSale {
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let product_id = errors.check(validate_uuid("productId", &self.product_id));
        let quantity = errors.check(validate_quantity(self.quantity));
        if let Some(price) = self.sale_price {
            if let (Some(p), Some(q)) = (errors.check(validate_money("salePrice", price)), quantity)
            {
                errors.check(validate_total("salePrice", p, q));
            }
        }
        let customer_name = errors.check(validate_optional_text(
            "customerName",
            self.customer_name.as_deref(),
            MAX_NAME_LEN,
        ));
        errors.into_result()?;

        Ok(Self {
            product_id: product_id.unwrap_or_default(),
            quantity: self.quantity,
            sale_price: self.sale_price,
            customer_name: customer_name.flatten(),
        })
    }
}

impl NewStockMovement {
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let product_id = errors.check(validate_uuid("productId", &self.product_id));
        errors.check(validate_quantity(self.quantity));
        let reason = errors.check(validate_optional_text(
            "reason",
            self.reason.as_deref(),
            MAX_TEXT_LEN,
        ));
        errors.into_result()?;

        Ok(Self {
            product_id: product_id.unwrap_or_default(),
            direction: self.direction,
            quantity: self.quantity,
            reason: reason.flatten(),
        })
    }
}

impl NewEmployee {
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let username = errors.check(validate_username(&self.username));
        errors.check(validate_password(&self.password));
        let full_name = errors.check(validate_name("fullName", &self.full_name));
        let email = errors.check(validate_email(self.email.as_deref()));
        errors.into_result()?;

        Ok(Self {
            username: username.unwrap_or_default(),
            password: self.password,
            full_name: full_name.unwrap_or_default(),
            email: email.flatten(),
            permissions: self.permissions,
        })
    }
}

impl UpdateEmployee {
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let full_name = match self.full_name.as_deref() {
            Some(n) => errors.check(validate_name("fullName", n)),
            None => None,
        };
        let email = match self.email.as_deref() {
            Some(e) => errors.check(validate_email(Some(e))).map(Option::unwrap_or_default),
            None => None,
        };
        if let Some(password) = self.password.as_deref() {
            errors.check(validate_password(password));
        }
        errors.into_result()?;

        Ok(Self {
            full_name,
            email,
            password: self.password,
            permissions: self.permissions,
            is_active: self.is_active,
        })
    }
}

impl NewContact {
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = errors.check(validate_name("name", &self.name));
        let phone = errors.check(validate_optional_text("phone", self.phone.as_deref(), 50));
        let email = errors.check(validate_email(self.email.as_deref()));
        errors.into_result()?;

        Ok(Self {
            name: name.unwrap_or_default(),
            phone: phone.flatten(),
            email: email.flatten(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
