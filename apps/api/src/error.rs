//! Error types for the REST API.
//!
//! ## Wire Taxonomy
//! ```text
//! NotFound     → 404  referenced entity id does not exist
//! BadRequest   → 400  validation failure, duplicate unique key, bulk errors
//! Unauthorized → 401  missing/invalid credential, inactive account
//! Forbidden    → 403  authenticated but role lacks permission
//! Conflict     → 409  invalid state transition (double-complete, etc.)
//! Internal     → 500  everything else; message logged, not leaked
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use cyltrack_core::CoreError;
use cyltrack_db::DbError;

/// REST API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Creates an Unauthorized error.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    /// Creates a BadRequest error.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => {
                // Database/internal details stay in the log
                error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Database failures map onto the wire taxonomy.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::UniqueViolation { .. } => ApiError::BadRequest(err.to_string()),
            DbError::ForeignKeyViolation { .. } => ApiError::BadRequest(err.to_string()),
            DbError::InvalidState { .. } => ApiError::Conflict(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Domain failures map onto the wire taxonomy.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            CoreError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            CoreError::Forbidden { .. } => ApiError::Forbidden(err.to_string()),
            CoreError::EmptyTransaction => ApiError::BadRequest(err.to_string()),
            CoreError::Validation(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_error_mapping() {
        let err: ApiError = DbError::not_found("Cylinder", "x").into();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err: ApiError = DbError::invalid_state("Transaction", "t", "completed", "pending").into();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err: ApiError = DbError::UniqueViolation {
            field: "cylinders.serial_number".to_string(),
            value: "S1".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_core_error_mapping() {
        let err: ApiError = CoreError::Forbidden {
            role: "driver".to_string(),
            action: "delete customer".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err: ApiError = CoreError::EmptyTransaction.into();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
