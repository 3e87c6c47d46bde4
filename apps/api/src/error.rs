//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in DukaSmart                              │
//! │                                                                         │
//! │  Handler: Result<Json<T>, ApiError>                                     │
//! │         │                                                               │
//! │         ├── ValidationErrors ──────────► 400 VALIDATION_ERROR + fields  │
//! │         ├── JsonRejection / Query ─────► 400 VALIDATION_ERROR           │
//! │         ├── no / stale session ────────► 401 UNAUTHORIZED               │
//! │         ├── role or capability ────────► 403 FORBIDDEN                  │
//! │         ├── DbError::NotFound ─────────► 404 NOT_FOUND                  │
//! │         ├── UniqueViolation / Conflict ► 409 CONFLICT                   │
//! │         ├── InsufficientStock ─────────► 422 INSUFFICIENT_STOCK         │
//! │         └── anything else ─────────────► 500 INTERNAL (logged, hidden)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Response Body
//! ```json
//! {
//!   "code": "VALIDATION_ERROR",
//!   "message": "Validation failed: quantity must be positive",
//!   "fields": [{ "field": "quantity", "message": "quantity must be positive" }]
//! }
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use duka_core::{CoreError, ValidationErrors};
use duka_db::DbError;

/// Error returned from every handler and extractor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Per-field problems; empty unless `code` is `VALIDATION_ERROR`.
    pub fields: Vec<FieldError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Error codes for API responses.
///
/// ## Usage in Frontend
/// ```typescript
/// const res = await fetch('/api/sales', { method: 'POST', body });
/// if (!res.ok) {
///   const e = await res.json();
///   switch (e.code) {
///     case 'INSUFFICIENT_STOCK':
///       showToast(e.message);
///       break;
///     case 'VALIDATION_ERROR':
///       highlight(e.fields);
///       break;
///   }
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Not logged in, or the session's user is gone or disabled (401)
    Unauthorized,

    /// Logged in but not allowed (403)
    Forbidden,

    /// Resource not found (404)
    NotFound,

    /// Duplicate value, or the resource is still referenced (409)
    Conflict,

    /// Not enough stock for a sale or outbound movement (422)
    InsufficientStock,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::InsufficientStock => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error without field detail.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized() -> Self {
        ApiError::new(ErrorCode::Unauthorized, "Authentication required")
    }

    pub fn forbidden() -> Self {
        ApiError::new(
            ErrorCode::Forbidden,
            "You do not have permission to perform this action",
        )
    }

    /// Creates an internal error. The message reaches the client, so keep
    /// it generic and log the cause separately.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Converts validation errors, keeping every field.
impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let message = errors.to_string();
        let fields = errors
            .into_iter()
            .map(|e| FieldError {
                field: e.field().to_string(),
                message: e.to_string(),
            })
            .collect();

        ApiError {
            code: ErrorCode::ValidationError,
            message,
            fields,
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),

            DbError::UniqueViolation { ref field, .. } => {
                let field = field.clone();
                ApiError {
                    code: ErrorCode::Conflict,
                    message: err.to_string(),
                    fields: vec![FieldError {
                        message: format!("{} is already taken", field),
                        field,
                    }],
                }
            }

            DbError::Conflict { .. } => ApiError::new(ErrorCode::Conflict, err.to_string()),

            DbError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }

            DbError::Invalid(errors) => errors.into(),

            DbError::ForeignKeyViolation { .. }
            | DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::PoolExhausted
            | DbError::Internal(_) => {
                tracing::error!(error = %err, "Database error");
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        DbError::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        tracing::error!(error = %err, "Session store error");
        ApiError::internal("An internal error occurred")
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use duka_core::ValidationError;

    #[test]
    fn test_validation_errors_keep_every_field() {
        let mut errors = ValidationErrors::new();
        errors.push(ValidationError::Required { field: "code".into() });
        errors.push(ValidationError::MustBePositive { field: "price".into() });

        let api: ApiError = errors.into();
        assert_eq!(api.code, ErrorCode::ValidationError);
        assert_eq!(api.code.status(), StatusCode::BAD_REQUEST);
        let fields: Vec<&str> = api.fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["code", "price"]);
    }

    #[test]
    fn test_db_error_mapping() {
        let api: ApiError = DbError::not_found("Product", "p1").into();
        assert_eq!(api.code.status(), StatusCode::NOT_FOUND);
        assert_eq!(api.message, "Product not found: p1");

        let api: ApiError = DbError::duplicate("code", "P-001").into();
        assert_eq!(api.code, ErrorCode::Conflict);
        assert_eq!(api.fields[0].field, "code");

        let api: ApiError = DbError::InsufficientStock {
            code: "P-001".into(),
            available: 3,
            requested: 5,
        }
        .into();
        assert_eq!(api.code.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(api.message.contains("available 3"));
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let api: ApiError = DbError::QueryFailed("no such table: secrets".into()).into();
        assert_eq!(api.code, ErrorCode::Internal);
        assert!(!api.message.contains("secrets"));
    }

    #[test]
    fn test_code_serializes_screaming_snake() {
        let json = serde_json::to_value(ApiError::forbidden()).unwrap();
        assert_eq!(json["code"], "FORBIDDEN");
        assert_eq!(json["fields"], serde_json::json!([]));
    }
}
