//! Utility bill entity - Gas, electricity, internet and similar monthly bills.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Utility bill database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "utility_bills")]
pub struct Model {
    /// Unique identifier for the bill
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Month the bill belongs to (`"YYYY-MM"`), fixed when the bill is created
    pub month_year: String,
    /// Bill name, e.g. `"Gas Bill"`
    pub name: String,
    /// Bill amount, always positive
    pub amount: f64,
}

/// Utility bills have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
