//! Entity module - SeaORM entity definitions for the mess ledger tables.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod bazar;
pub mod deposit;
pub mod meal;
pub mod member;
pub mod utility_bill;

// Re-export specific types to avoid conflicts
pub use bazar::{Column as BazarColumn, Entity as Bazar, Model as BazarModel};
pub use deposit::{Column as DepositColumn, Entity as Deposit, Model as DepositModel};
pub use meal::{Column as MealColumn, Entity as Meal, Model as MealModel};
pub use member::{Column as MemberColumn, Entity as Member, Model as MemberModel};
pub use utility_bill::{
    Column as UtilityBillColumn, Entity as UtilityBill, Model as UtilityBillModel,
};
