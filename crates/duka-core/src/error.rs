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
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Record validation failures                     │
//! │                                                                         │
//! │  duka-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  duka-sync errors (separate crate)                                     │
//! │  ├── SyncError        - Engine / config / channel failures             │
//! │  └── LedgerError      - Remote submission failures (stay internal)     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SyncError → caller                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, business id, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Transaction cannot be found.
    ///
    /// ## When This Occurs
    /// - Business id doesn't exist in the local queue
    /// - Receipt lookup for a sale made on another device
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Transaction has exceeded maximum allowed items.
    #[error("Transaction cannot have more than {max} items")]
    TooManyItems { max: usize },

    /// The frozen amounts on a record do not add up.
    ///
    /// ## When This Occurs
    /// - A line total differs from unit price × quantity
    /// - The subtotal differs from the sum of line totals
    /// - total ≠ subtotal - discount + tax
    ///
    /// The queue refuses such records instead of repairing them; amounts
    /// are frozen at checkout and never recomputed downstream.
    #[error("Inconsistent amounts on transaction: {reason}")]
    InconsistentAmounts { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a record doesn't meet requirements.
/// Used for early validation before the record reaches storage.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

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

    /// Invalid format (e.g., malformed business id).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
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
        let err = CoreError::TooManyItems { max: 100 };
        assert_eq!(
            err.to_string(),
            "Transaction cannot have more than 100 items"
        );

        let err = CoreError::InconsistentAmounts {
            reason: "total is 11601 but subtotal - discount + tax is 11600".to_string(),
        };
        assert!(err.to_string().starts_with("Inconsistent amounts"));
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "items".to_string(),
        };
        assert_eq!(err.to_string(), "items is required");

        let err = ValidationError::MustNotBeNegative {
            field: "unit_price_cents".to_string(),
        };
        assert_eq!(err.to_string(), "unit_price_cents must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
