//! Bazar entity - A shared grocery purchase.
//!
//! Bazar spending is not attributed to any member; it is spread over everyone
//! through the monthly meal rate.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Bazar database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bazar_entries")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Amount spent, always positive
    pub amount: f64,
    /// What was bought
    pub description: String,
    /// When the purchase was recorded; its UTC month decides the period
    pub timestamp: DateTimeUtc,
}

/// Bazar entries have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
