//! # Error Types
//!
//! Domain-specific error types for cyltrack-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cyltrack-core errors (this file)                                      │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  cyltrack-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  API errors (in app)                                                   │
//! │  └── ApiError         - What HTTP clients see (status + JSON)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (serial number, ID, etc.)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-facing messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced entity cannot be found.
    ///
    /// ## When This Occurs
    /// - Cylinder/customer/location ID doesn't exist
    /// - Movement references a destination that was deleted
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A record is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Completing a transaction that is not `pending`
    /// - Completing a maintenance record that is already `completed`
    #[error("{entity} {id} is {current}, cannot perform operation")]
    InvalidTransition {
        entity: String,
        id: String,
        current: String,
    },

    /// Caller is authenticated but their role does not permit the action.
    #[error("Role {role} is not permitted to {action}")]
    Forbidden { role: String, action: String },

    /// A transaction must carry at least one line item.
    #[error("Transaction requires at least one line item")]
    EmptyTransaction,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid email, invalid enum label).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate serial number).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

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
    fn test_error_messages() {
        let err = CoreError::not_found("Cylinder", "abc-123");
        assert_eq!(err.to_string(), "Cylinder not found: abc-123");

        let err = CoreError::InvalidTransition {
            entity: "Transaction".to_string(),
            id: "t-1".to_string(),
            current: "completed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Transaction t-1 is completed, cannot perform operation"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "serial_number".to_string(),
        };
        assert_eq!(err.to_string(), "serial_number is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "email".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
