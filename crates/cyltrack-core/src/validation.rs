//! # Validation Module
//!
//! Input validation utilities for CylTrack.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request deserialization (serde)                              │
//! │  ├── Type validation (numbers are numbers, enums are known labels)     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation                       │
//! │  ├── Non-empty identifiers, positive quantities, sane frequencies      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints (serial_number, barcode, email)                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a cylinder serial number.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use cyltrack_core::validation::validate_serial_number;
///
/// assert!(validate_serial_number("OX-2024-0042").is_ok());
/// assert!(validate_serial_number("").is_err());
/// ```
pub fn validate_serial_number(serial: &str) -> ValidationResult<()> {
    let serial = serial.trim();

    if serial.is_empty() {
        return Err(ValidationError::Required {
            field: "serial_number".to_string(),
        });
    }

    if serial.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "serial_number".to_string(),
            max: 50,
        });
    }

    if !serial
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "serial_number".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// Shallow structural check only: something, an `@`, something with a dot.
/// Deliverability is not this layer's problem.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let parts: Vec<&str> = email.splitn(2, '@').collect();
    let valid = parts.len() == 2
        && !parts[0].is_empty()
        && parts[1].contains('.')
        && !parts[1].starts_with('.')
        && !parts[1].ends_with('.');

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "not a valid email address".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (customer name, location name, full name).
pub fn validate_name(field: &'static str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line-item quantity.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a unit price in cents. Zero is allowed (free replacements),
/// negative is not.
pub fn validate_unit_price(unit_price_cents: i64) -> ValidationResult<()> {
    if unit_price_cents < 0 {
        return Err(ValidationError::MustBePositive {
            field: "unit_price_cents".to_string(),
        });
    }
    Ok(())
}

/// Validates a maintenance-schedule frequency in days.
pub fn validate_frequency_days(frequency_days: i64) -> ValidationResult<()> {
    if frequency_days <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "frequency_days".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Pagination
// =============================================================================

/// Normalizes `skip`/`limit` query parameters.
///
/// Negative skip becomes 0; an absent limit becomes the default; an
/// oversized limit is clamped to the maximum.
pub fn clamp_pagination(skip: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let skip = skip.unwrap_or(0).max(0);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
    (skip, limit)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_number() {
        assert!(validate_serial_number("OX-2024-0042").is_ok());
        assert!(validate_serial_number("S1").is_ok());
        assert!(validate_serial_number("").is_err());
        assert!(validate_serial_number("   ").is_err());
        assert!(validate_serial_number("has space").is_err());
        assert!(validate_serial_number(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_email() {
        assert!(validate_email("ops@acme-gas.example").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("nope").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_name() {
        assert!(validate_name("name", "Acme Gas Supply").is_ok());
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", &"x".repeat(201)).is_err());
    }

    #[test]
    fn test_quantity_and_price() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());

        assert!(validate_unit_price(0).is_ok());
        assert!(validate_unit_price(9999).is_ok());
        assert!(validate_unit_price(-1).is_err());
    }

    #[test]
    fn test_frequency() {
        assert!(validate_frequency_days(365).is_ok());
        assert!(validate_frequency_days(0).is_err());
    }

    #[test]
    fn test_pagination_clamp() {
        assert_eq!(clamp_pagination(None, None), (0, 100));
        assert_eq!(clamp_pagination(Some(-5), Some(0)), (0, 1));
        assert_eq!(clamp_pagination(Some(20), Some(50)), (20, 50));
        assert_eq!(clamp_pagination(None, Some(100_000)), (0, 1000));
    }
}
