//! Boundary checks shared by every ledger write.
//!
//! Callers run these before opening a transaction so a rejected request never
//! touches the store.

use crate::errors::{Error, Result};

/// Accepts strictly positive, finite amounts.
pub fn require_positive_amount(amount: f64) -> Result<f64> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(Error::InvalidAmount { amount })
    }
}

/// Accepts non-blank text and returns it trimmed.
pub fn require_text(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::BlankField { field });
    }
    Ok(trimmed.to_string())
}
