//! Meal entity - One member's meals on one calendar day.
//!
//! There is at most one row per `(member_id, date)`; a unique index created in
//! `config::database` enforces it. Each slot holds either 0 or the fixed point value
//! of that meal (see [`crate::core::meal::MealType`]).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Meal database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "meals")]
pub struct Model {
    /// Unique identifier for the record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the member who ate
    pub member_id: i64,
    /// Calendar day, stored as `YYYY-MM-DD`
    pub date: Date,
    /// 0.0 or 0.5
    pub breakfast: f64,
    /// 0.0 or 1.0
    pub lunch: f64,
    /// 0.0 or 1.0
    pub dinner: f64,
}

/// Defines relationships between Meal and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each meal record belongs to one member
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
