//! Unified error type for the mess ledger and settlement engine.

use crate::core::meal::MealType;
use thiserror::Error;

/// Every failure the crate can report.
///
/// Input validation failures (`InvalidAmount`, `BlankField`, `InvalidMealValue`,
/// `InvalidPeriod`) are raised before any write happens. `Database` is the
/// store being unavailable or rejecting a statement and is never produced by the
/// settlement arithmetic itself.
#[derive(Debug, Error)]
pub enum Error {
    /// The ledger store failed.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Human readable description
        message: String,
    },

    /// Amount was zero, negative, NaN or infinite.
    #[error("Invalid amount: {amount} (must be a positive, finite number)")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// A required text field was empty or whitespace only.
    #[error("{field} cannot be blank")]
    BlankField {
        /// Name of the offending field
        field: &'static str,
    },

    /// A meal field held something other than 0 or its fixed point value.
    #[error("Invalid {meal_type} value: {value}")]
    InvalidMealValue {
        /// Which meal slot
        meal_type: MealType,
        /// The rejected value
        value: f64,
    },

    /// A month key did not look like `YYYY-MM`.
    #[error("Invalid period '{value}' (expected YYYY-MM)")]
    InvalidPeriod {
        /// The rejected input
        value: String,
    },

    /// No member with this id.
    #[error("Member not found: {id}")]
    MemberNotFound {
        /// Member id that was looked up
        id: i64,
    },

    /// Some other ledger row was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"bazar entry"`
        entity: &'static str,
        /// Row id that was looked up
        id: i64,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
