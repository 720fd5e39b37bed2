//! Database configuration module for the mess ledger.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust structs.
//! The one constraint entities cannot express, uniqueness of a member's meal record
//! per day, is added as an explicit index.

use crate::entities::{Bazar, Deposit, Meal, Member, UtilityBill, meal};
use crate::errors::Result;
use sea_orm::sea_query::{Index, TableCreateStatement};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info};

/// Used when `DATABASE_URL` is not set. `mode=rwc` lets `SQLite` create the file.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/mess_manager.sqlite?mode=rwc";

/// Gets the database URL from the environment or returns the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to [`DEFAULT_DATABASE_URL`] when the variable is not set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    connect(&get_database_url()).await
}

/// Connects to the given database URL.
///
/// In-memory `SQLite` databases exist per connection, so those are pinned to a
/// single pooled connection.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url);
    options.sqlx_logging(false);
    if database_url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }
    debug!("Connecting to database at {database_url}");
    Database::connect(options).await.map_err(Into::into)
}

/// Creates all ledger tables (if missing) from the entity definitions, plus the
/// `(member_id, date)` unique index on meals.
///
/// Members are created first because deposits and meals reference them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let tables: [TableCreateStatement; 5] = [
        schema.create_table_from_entity(Member),
        schema.create_table_from_entity(Deposit),
        schema.create_table_from_entity(Bazar),
        schema.create_table_from_entity(Meal),
        schema.create_table_from_entity(UtilityBill),
    ];

    for mut table in tables {
        table.if_not_exists();
        db.execute(builder.build(&table)).await?;
    }

    let meal_day_index = Index::create()
        .name("idx_meals_member_date")
        .table(Meal)
        .col(meal::Column::MemberId)
        .col(meal::Column::Date)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&meal_day_index)).await?;

    info!("Database tables ensured.");
    Ok(())
}
