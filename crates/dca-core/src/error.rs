//! # Validation Errors
//!
//! Input validation failures raised while constructing core values
//! (amounts, timestamps, role names). Engine-level error kinds live in
//! `dca-state` and `dca-workflow`; they wrap this type.

use thiserror::Error;

/// A value failed validation before reaching any engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field was empty or whitespace.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// An amount that must be strictly positive was zero or negative.
    #[error("{field} must be greater than zero, got {value}")]
    NonPositiveAmount {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value in minor units.
        value: i64,
    },

    /// Arithmetic on an amount left the representable range.
    #[error("amount overflow in {0}")]
    AmountOverflow(&'static str),

    /// A value could not be parsed or is outside its allowed set.
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable rejection reason.
        reason: String,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::InvalidValue`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Reject empty or whitespace-only text.
pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_message_names_field() {
        let err = ValidationError::EmptyField("full_name");
        assert_eq!(err.to_string(), "full_name must not be empty");
    }

    #[test]
    fn non_positive_amount_message() {
        let err = ValidationError::NonPositiveAmount {
            field: "amount",
            value: -5,
        };
        assert!(err.to_string().contains("-5"));
    }

    #[test]
    fn require_non_empty_rejects_whitespace() {
        assert!(require_non_empty("note", "   ").is_err());
        assert!(require_non_empty("note", "called twice").is_ok());
    }
}
