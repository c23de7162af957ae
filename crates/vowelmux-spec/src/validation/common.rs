//! Common validation utilities for numeric parameters.

use std::fmt;

/// Error type for common validation failures.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonValidationError {
    /// Human-readable error message.
    pub message: String,
}

impl CommonValidationError {
    /// Creates a new validation error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CommonValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CommonValidationError {}

/// Validate that a value is positive (> 0).
///
/// # Example
/// ```
/// use vowelmux_spec::validation::common::validate_positive;
///
/// assert!(validate_positive("q", 30.0).is_ok());
/// assert!(validate_positive("q", 0.0).is_err());
/// assert!(validate_positive("q", f64::NAN).is_err());
/// ```
pub fn validate_positive(name: &str, value: f64) -> Result<(), CommonValidationError> {
    if !value.is_finite() {
        return Err(CommonValidationError::new(format!(
            "{} must be finite, got {}",
            name, value
        )));
    }
    if value <= 0.0 {
        return Err(CommonValidationError::new(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Validate that a value is non-negative (>= 0).
pub fn validate_non_negative(name: &str, value: f64) -> Result<(), CommonValidationError> {
    if !value.is_finite() {
        return Err(CommonValidationError::new(format!(
            "{} must be finite, got {}",
            name, value
        )));
    }
    if value < 0.0 {
        return Err(CommonValidationError::new(format!(
            "{} must be non-negative, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Validate that a value lies strictly between `min` and `max`.
///
/// Frequencies must sit strictly inside `(0, nyquist)`, so both bounds are
/// exclusive.
///
/// # Example
/// ```
/// use vowelmux_spec::validation::common::validate_open_range;
///
/// assert!(validate_open_range("cutoff", 3400.0, 0.0, 4000.0).is_ok());
/// assert!(validate_open_range("cutoff", 4000.0, 0.0, 4000.0).is_err());
/// ```
pub fn validate_open_range(
    name: &str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), CommonValidationError> {
    if !value.is_finite() {
        return Err(CommonValidationError::new(format!(
            "{} must be finite, got {}",
            name, value
        )));
    }
    if value <= min || value >= max {
        return Err(CommonValidationError::new(format!(
            "{} must be in ({}, {}), got {}",
            name, min, max, value
        )));
    }
    Ok(())
}

/// Validate that a value is within a specified range [min, max].
pub fn validate_range(
    name: &str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), CommonValidationError> {
    if !value.is_finite() {
        return Err(CommonValidationError::new(format!(
            "{} must be finite, got {}",
            name, value
        )));
    }
    if value < min || value > max {
        return Err(CommonValidationError::new(format!(
            "{} must be in [{}, {}], got {}",
            name, min, max, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive("x", 1.0).is_ok());
        assert!(validate_positive("x", 1e-9).is_ok());

        let err = validate_positive("x", -1.0).unwrap_err();
        assert!(err.message.contains("positive"));

        let err = validate_positive("x", f64::INFINITY).unwrap_err();
        assert!(err.message.contains("finite"));
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative("factor", 0.0).is_ok());
        assert!(validate_non_negative("factor", 2.0).is_ok());
        assert!(validate_non_negative("factor", -0.1).is_err());
    }

    #[test]
    fn test_validate_open_range() {
        assert!(validate_open_range("f", 1.0, 0.0, 2.0).is_ok());
        assert!(validate_open_range("f", 0.0, 0.0, 2.0).is_err());
        assert!(validate_open_range("f", 2.0, 0.0, 2.0).is_err());

        let err = validate_open_range("f", 5.0, 0.0, 2.0).unwrap_err();
        assert_eq!(err.to_string(), "f must be in (0, 2), got 5");
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("t", 1.0, 0.0, 1.0).is_ok());
        assert!(validate_range("t", 0.0, 0.0, 1.0).is_ok());
        assert!(validate_range("t", 1.5, 0.0, 1.0).is_err());
        assert!(validate_range("t", f64::NAN, 0.0, 1.0).is_err());
    }
}
