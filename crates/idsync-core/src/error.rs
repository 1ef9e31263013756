//! # Error Types
//!
//! Domain-specific error types for idsync-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  idsync-core errors (this file)                                        │
//! │  ├── CoreError        - Domain rule violations (unknown role, ...)     │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  idsync-db errors (separate crate)                                     │
//! │  └── StoreError       - Store A / Store B operation failures           │
//! │                                                                         │
//! │  idsync errors (engine crate)                                          │
//! │  └── SyncError        - Connectivity / write / config failures         │
//! │                                                                         │
//! │  sync-server errors                                                    │
//! │  └── ApiError         - What HTTP callers see (serialized)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → StoreError → SyncError → ApiError │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A stored role is outside the closed `user | admin` set.
    ///
    /// ## When This Occurs
    /// - A legacy document carries a role string the platform never issued
    /// - Someone wrote a free-form value into `user_profiles.role`
    #[error("Unknown role '{0}': expected 'user' or 'admin'")]
    UnknownRole(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: u64, max: u64 },

    /// Invalid format (e.g., an email without '@').
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::UnknownRole("superuser".to_string());
        assert_eq!(
            err.to_string(),
            "Unknown role 'superuser': expected 'user' or 'admin'"
        );

        let err = ValidationError::OutOfRange {
            field: "interval_minutes".to_string(),
            min: 1,
            max: 1440,
        };
        assert_eq!(err.to_string(), "interval_minutes must be between 1 and 1440");
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
