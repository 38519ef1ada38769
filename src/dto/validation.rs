//! Validation helpers for DTOs.

use validator::ValidationError;

/// Rejects strings made only of whitespace.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must contain at least one non-whitespace character".into());
        return Err(err);
    }
    Ok(())
}

/// Rejects entry fees that are negative or not finite.
pub fn validate_entry_fee(fee: f64) -> Result<(), ValidationError> {
    if !fee.is_finite() || fee < 0.0 {
        let mut err = ValidationError::new("entry_fee");
        err.message = Some(format!("entry fee must be a non-negative amount (got {fee})").into());
        return Err(err);
    }
    Ok(())
}
