//! Deposit entity - Money a member handed to the mess.
//!
//! Deposits are append-only and belong to exactly one member.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Deposit database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deposits")]
pub struct Model {
    /// Unique identifier for the deposit
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the member who made the deposit
    pub member_id: i64,
    /// Deposited amount, always positive
    pub amount: f64,
    /// When the deposit was recorded
    pub timestamp: DateTimeUtc,
    /// Free text, `"Deposit"` unless the caller says otherwise
    pub description: String,
}

/// Defines relationships between Deposit and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each deposit belongs to one member
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::MemberId",
        to = "super::member::Column::Id",
        on_delete = "Cascade"
    )]
    Member,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
