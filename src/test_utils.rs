//! Shared test utilities for the mess ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        ledger::Ledger,
        meal::{MealType, toggle_meal},
        member,
    },
    entities,
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = crate::config::database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a [`Ledger`] over a fresh in-memory database.
pub async fn setup_test_ledger() -> Result<Ledger> {
    Ok(Ledger::new(setup_test_db().await?))
}

/// Routes `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// Creates a test member with sensible defaults.
///
/// # Defaults
/// * `contact`: empty
/// * `given_amount`: 0.0
pub async fn create_test_member(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::member::Model> {
    member::create_member(db, name.to_string(), String::new()).await
}

/// Sets up a complete test environment with one member.
/// Returns (db, member) for common test scenarios.
pub async fn setup_with_member() -> Result<(DatabaseConnection, entities::member::Model)> {
    let db = setup_test_db().await?;
    let member = create_test_member(&db, "Test Member").await?;
    Ok((db, member))
}

/// Ticks breakfast, lunch and dinner for a member on `date` (2.5 meals).
pub async fn record_full_day(
    db: &DatabaseConnection,
    member_id: i64,
    date: NaiveDate,
) -> Result<entities::meal::Model> {
    toggle_meal(db, member_id, date, MealType::Breakfast, true).await?;
    toggle_meal(db, member_id, date, MealType::Lunch, true).await?;
    toggle_meal(db, member_id, date, MealType::Dinner, true).await
}
