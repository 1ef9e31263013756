//! # Validation Module
//!
//! Input normalization and checks used by the engine, the scheduler and
//! the control surface.
//!
//! ## Usage
//! ```rust
//! use idsync_core::validation::{normalize_email, validate_interval_minutes};
//!
//! assert_eq!(normalize_email("  Bob@X.com "), "bob@x.com");
//! assert!(validate_interval_minutes(0).is_err());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted scheduler cadence (one day).
pub const MAX_INTERVAL_MINUTES: u64 = 24 * 60;

/// Returns the join key for an email: trimmed and case-folded.
///
/// Only ASCII whitespace is trimmed, the same set the profile store strips
/// with `btrim` in SQL. An empty result means the record has no usable
/// identity.
pub fn normalize_email(email: &str) -> String {
    email
        .trim_matches(|c: char| c.is_ascii_whitespace())
        .to_lowercase()
}

/// Validates an email supplied by a caller (not one read from a store).
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must contain exactly one '@' with text on both sides
///
/// ## Returns
/// The normalized email.
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = normalize_email(email);

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let mut parts = email.split('@');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
    );

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected local@domain".to_string(),
        });
    }

    Ok(email)
}

/// Validates the scheduler cadence.
///
/// ## Rules
/// - At least 1 minute
/// - At most [`MAX_INTERVAL_MINUTES`]
pub fn validate_interval_minutes(minutes: u64) -> ValidationResult<()> {
    if !(1..=MAX_INTERVAL_MINUTES).contains(&minutes) {
        return Err(ValidationError::OutOfRange {
            field: "interval_minutes".to_string(),
            min: 1,
            max: MAX_INTERVAL_MINUTES,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("a@x.com"), "a@x.com");
        assert_eq!(normalize_email("  A@X.Com\n"), "a@x.com");
        assert_eq!(normalize_email("   "), "");
        assert_eq!(normalize_email("\tPad@X.com \r\n"), "pad@x.com");
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email(" Bob@X.com ").unwrap(), "bob@x.com");
        assert!(validate_email("").is_err());
        assert!(validate_email("bob").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("bob@").is_err());
        assert!(validate_email("a@b@c").is_err());
    }

    #[test]
    fn test_validate_interval() {
        assert!(validate_interval_minutes(1).is_ok());
        assert!(validate_interval_minutes(60).is_ok());
        assert!(validate_interval_minutes(MAX_INTERVAL_MINUTES).is_ok());
        assert!(validate_interval_minutes(0).is_err());
        assert!(validate_interval_minutes(MAX_INTERVAL_MINUTES + 1).is_err());
    }
}
