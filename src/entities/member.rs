//! Member entity - A person sharing the mess.
//!
//! `given_amount` is a running total of every deposit the member has made. It is a
//! cached value maintained by the deposit path in `core::deposit`, never written
//! directly by callers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Member database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "members")]
pub struct Model {
    /// Unique identifier for the member
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Phone number or other contact detail
    pub contact: String,
    /// Sum of all deposits made by this member
    pub given_amount: f64,
}

/// Defines relationships between Member and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One member has many deposits
    #[sea_orm(has_many = "super::deposit::Entity")]
    Deposits,
    /// One member has many daily meal records
    #[sea_orm(has_many = "super::meal::Entity")]
    Meals,
}

impl Related<super::deposit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deposits.def()
    }
}

impl Related<super::meal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
