//! Meal business logic - Daily meal records and checkbox toggling.
//!
//! A member's day is one row holding three slots. Ticking a slot stores the slot's
//! fixed point value, unticking stores 0. [`apply_meal_toggle`] is the pure
//! transformation. [`toggle_meal`] stores it with an upsert keyed by
//! `(member_id, date)` that writes only the toggled slot's column.

use crate::{
    core::period::Period,
    entities::{Meal, Member, meal},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::sea_query::{Expr, Func, OnConflict, SimpleExpr};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, instrument};

/// The three meal slots of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    /// Counts half a meal
    Breakfast,
    /// Counts one meal
    Lunch,
    /// Counts one meal
    Dinner,
}

impl MealType {
    /// All slots in display order
    pub const ALL: [Self; 3] = [Self::Breakfast, Self::Lunch, Self::Dinner];

    /// Fixed point value recorded when the slot is ticked.
    #[must_use]
    pub const fn points(self) -> f64 {
        match self {
            Self::Breakfast => 0.5,
            Self::Lunch | Self::Dinner => 1.0,
        }
    }

    /// Column storing this slot
    const fn column(self) -> meal::Column {
        match self {
            Self::Breakfast => meal::Column::Breakfast,
            Self::Lunch => meal::Column::Lunch,
            Self::Dinner => meal::Column::Dinner,
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
        };
        f.write_str(name)
    }
}

/// A member's meals on one day, independent of its storage row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    /// Who ate
    pub member_id: i64,
    /// Which day
    pub date: NaiveDate,
    /// 0.0 or 0.5
    pub breakfast: f64,
    /// 0.0 or 1.0
    pub lunch: f64,
    /// 0.0 or 1.0
    pub dinner: f64,
}

impl MealRecord {
    /// Nothing eaten yet.
    #[must_use]
    pub const fn empty(member_id: i64, date: NaiveDate) -> Self {
        Self {
            member_id,
            date,
            breakfast: 0.0,
            lunch: 0.0,
            dinner: 0.0,
        }
    }

    /// Value stored in `meal_type`'s slot
    #[must_use]
    pub const fn slot(&self, meal_type: MealType) -> f64 {
        match meal_type {
            MealType::Breakfast => self.breakfast,
            MealType::Lunch => self.lunch,
            MealType::Dinner => self.dinner,
        }
    }

    /// Whether `meal_type` is ticked
    #[must_use]
    pub fn is_checked(&self, meal_type: MealType) -> bool {
        self.slot(meal_type) > 0.0
    }

    /// Meal count for the day
    #[must_use]
    pub fn total(&self) -> f64 {
        self.breakfast + self.lunch + self.dinner
    }

    /// Rejects any slot that is neither 0 nor its point value.
    #[allow(clippy::float_cmp)] // slots only ever hold the exact constants
    pub fn validate(&self) -> Result<()> {
        for meal_type in MealType::ALL {
            let value = self.slot(meal_type);
            if value != 0.0 && value != meal_type.points() {
                return Err(Error::InvalidMealValue { meal_type, value });
            }
        }
        Ok(())
    }
}

impl From<meal::Model> for MealRecord {
    fn from(model: meal::Model) -> Self {
        Self {
            member_id: model.member_id,
            date: model.date,
            breakfast: model.breakfast,
            lunch: model.lunch,
            dinner: model.dinner,
        }
    }
}

/// Sets one slot from a checkbox state, carrying the other two over.
///
/// `existing` is the stored record for `(member_id, date)`, if any. Setting the same
/// slot twice overwrites; it never accumulates.
#[must_use]
pub fn apply_meal_toggle(
    existing: Option<MealRecord>,
    member_id: i64,
    date: NaiveDate,
    meal_type: MealType,
    is_checked: bool,
) -> MealRecord {
    let mut record = existing.unwrap_or_else(|| MealRecord::empty(member_id, date));
    let value = if is_checked { meal_type.points() } else { 0.0 };
    match meal_type {
        MealType::Breakfast => record.breakfast = value,
        MealType::Lunch => record.lunch = value,
        MealType::Dinner => record.dinner = value,
    }
    record
}

/// Finds the meal row for a member on a day.
pub async fn get_meal<C>(db: &C, member_id: i64, date: NaiveDate) -> Result<Option<meal::Model>>
where
    C: ConnectionTrait,
{
    Meal::find()
        .filter(meal::Column::MemberId.eq(member_id))
        .filter(meal::Column::Date.eq(date))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists every member's meal row for one day.
pub async fn get_meals_for_date(
    db: &DatabaseConnection,
    date: NaiveDate,
) -> Result<Vec<meal::Model>> {
    Meal::find()
        .filter(meal::Column::Date.eq(date))
        .order_by_asc(meal::Column::MemberId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Writes `record` with a single `INSERT .. ON CONFLICT (member_id, date) DO UPDATE`
/// that only touches `slots`, then reads the stored row back.
///
/// The statement is atomic, so concurrent writes to different slots of the same day
/// all land.
async fn write_slots(
    db: &DatabaseConnection,
    record: &MealRecord,
    slots: &[MealType],
) -> Result<meal::Model> {
    if Member::find_by_id(record.member_id).one(db).await?.is_none() {
        return Err(Error::MemberNotFound {
            id: record.member_id,
        });
    }

    let row = meal::ActiveModel {
        member_id: Set(record.member_id),
        date: Set(record.date),
        breakfast: Set(record.breakfast),
        lunch: Set(record.lunch),
        dinner: Set(record.dinner),
        ..Default::default()
    };

    Meal::insert(row)
        .on_conflict(
            OnConflict::columns([meal::Column::MemberId, meal::Column::Date])
                .update_columns(slots.iter().copied().map(MealType::column))
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    get_meal(db, record.member_id, record.date)
        .await?
        .ok_or(Error::MemberNotFound {
            id: record.member_id,
        })
}

/// Inserts or updates the row keyed by `(record.member_id, record.date)`.
///
/// # Errors
/// Returns an error if:
/// - A slot holds something other than 0 or its point value
/// - The member does not exist
/// - The database operation fails
#[instrument(skip(db))]
pub async fn upsert_meal(db: &DatabaseConnection, record: &MealRecord) -> Result<meal::Model> {
    record.validate()?;

    let saved = write_slots(db, record, &MealType::ALL).await?;

    debug!(
        "Saved meals for member {} on {}: total {}",
        saved.member_id,
        saved.date,
        record.total()
    );
    Ok(saved)
}

/// Ticks or unticks one slot of a member's day and stores the result.
///
/// Only `meal_type`'s column is written, so the other two slots keep whatever is
/// stored at the time of the write, even if another toggle changed them meanwhile.
pub async fn toggle_meal(
    db: &DatabaseConnection,
    member_id: i64,
    date: NaiveDate,
    meal_type: MealType,
    is_checked: bool,
) -> Result<meal::Model> {
    let fresh = apply_meal_toggle(None, member_id, date, meal_type, is_checked);
    let saved = write_slots(db, &fresh, &[meal_type]).await?;
    info!("Member {member_id} {meal_type} on {date} set to {is_checked}");
    Ok(saved)
}

/// Sum of `breakfast + lunch + dinner` over a member's rows dated in `period`.
///
/// Returns 0.0 when the member has no rows in the month.
pub async fn sum_meals_for_member(
    db: &DatabaseConnection,
    member_id: i64,
    period: Period,
) -> Result<f64> {
    let day_total = Expr::col(meal::Column::Breakfast)
        .add(Expr::col(meal::Column::Lunch))
        .add(Expr::col(meal::Column::Dinner));

    let total: Option<Option<f64>> = Meal::find()
        .select_only()
        .column_as(SimpleExpr::from(Func::sum(day_total)), "total")
        .filter(meal::Column::MemberId.eq(member_id))
        .filter(meal::Column::Date.gte(period.first_day()))
        .filter(meal::Column::Date.lte(period.last_day()))
        .into_tuple()
        .one(db)
        .await?;

    Ok(total.flatten().unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
    }

    #[test]
    fn test_points() {
        assert_eq!(MealType::Breakfast.points(), 0.5);
        assert_eq!(MealType::Lunch.points(), 1.0);
        assert_eq!(MealType::Dinner.points(), 1.0);
    }

    #[test]
    fn test_toggle_without_existing_starts_from_zero() {
        let record = apply_meal_toggle(None, 7, day(1), MealType::Lunch, true);
        assert_eq!(record.member_id, 7);
        assert_eq!(record.date, day(1));
        assert_eq!(record.breakfast, 0.0);
        assert_eq!(record.lunch, 1.0);
        assert_eq!(record.dinner, 0.0);
    }

    #[test]
    fn test_toggle_is_idempotent() {
        let once = apply_meal_toggle(None, 1, day(2), MealType::Breakfast, true);
        let twice = apply_meal_toggle(Some(once), 1, day(2), MealType::Breakfast, true);
        assert_eq!(once, twice);
        assert_eq!(twice.breakfast, 0.5);

        let off_once = apply_meal_toggle(Some(twice), 1, day(2), MealType::Breakfast, false);
        let off_twice = apply_meal_toggle(Some(off_once), 1, day(2), MealType::Breakfast, false);
        assert_eq!(off_once, off_twice);
    }

    #[test]
    fn test_breakfast_off_leaves_lunch_alone() {
        let record = apply_meal_toggle(None, 1, day(3), MealType::Lunch, true);
        let record = apply_meal_toggle(Some(record), 1, day(3), MealType::Breakfast, true);
        let record = apply_meal_toggle(Some(record), 1, day(3), MealType::Breakfast, false);

        assert_eq!(record.breakfast, 0.0);
        assert_eq!(record.lunch, 1.0);
        assert!(record.is_checked(MealType::Lunch));
        assert!(!record.is_checked(MealType::Breakfast));
    }

    #[test]
    fn test_full_day_total() {
        let mut record = MealRecord::empty(1, day(4));
        for meal_type in MealType::ALL {
            record = apply_meal_toggle(Some(record), 1, day(4), meal_type, true);
        }
        assert_eq!(record.total(), 2.5);
        assert!(record.validate().is_ok());
    }

    #[tokio::test]
    async fn test_upsert_rejects_custom_amount() -> Result<()> {
        let db = setup_test_db().await?;
        let record = MealRecord {
            lunch: 0.75,
            ..MealRecord::empty(1, day(5))
        };

        let result = upsert_meal(&db, &record).await;
        assert!(matches!(
            result,
            Err(Error::InvalidMealValue {
                meal_type: MealType::Lunch,
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_unknown_member() -> Result<()> {
        let db = setup_test_db().await?;
        let record = MealRecord::empty(404, day(5));

        let result = upsert_meal(&db, &record).await;
        assert!(matches!(result, Err(Error::MemberNotFound { id: 404 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_meal_overwrites_same_row() -> Result<()> {
        let (db, member) = setup_with_member().await?;

        let first = toggle_meal(&db, member.id, day(6), MealType::Dinner, true).await?;
        let second = toggle_meal(&db, member.id, day(6), MealType::Dinner, true).await?;
        let third = toggle_meal(&db, member.id, day(6), MealType::Breakfast, true).await?;

        assert_eq!(first.id, second.id);
        assert_eq!(second.id, third.id);
        assert_eq!(third.dinner, 1.0);
        assert_eq!(third.breakfast, 0.5);

        let rows = get_meals_for_date(&db, day(6)).await?;
        assert_eq!(rows.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_toggles_of_different_slots_both_land() -> Result<()> {
        let (db, member) = setup_with_member().await?;
        toggle_meal(&db, member.id, day(8), MealType::Dinner, true).await?;

        let (breakfast, lunch) = tokio::join!(
            toggle_meal(&db, member.id, day(8), MealType::Breakfast, true),
            toggle_meal(&db, member.id, day(8), MealType::Lunch, true),
        );
        breakfast?;
        lunch?;

        let stored = MealRecord::from(get_meal(&db, member.id, day(8)).await?.unwrap());
        assert_eq!(stored.breakfast, 0.5);
        assert_eq!(stored.lunch, 1.0);
        assert_eq!(stored.dinner, 1.0);
        assert_eq!(get_meals_for_date(&db, day(8)).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_replaces_all_slots() -> Result<()> {
        let (db, member) = setup_with_member().await?;
        record_full_day(&db, member.id, day(9)).await?;

        let record = MealRecord {
            lunch: MealType::Lunch.points(),
            ..MealRecord::empty(member.id, day(9))
        };
        let saved = upsert_meal(&db, &record).await?;

        assert_eq!(MealRecord::from(saved), record);
        assert_eq!(get_meals_for_date(&db, day(9)).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_meal_off_after_on() -> Result<()> {
        let (db, member) = setup_with_member().await?;

        toggle_meal(&db, member.id, day(7), MealType::Lunch, true).await?;
        let row = toggle_meal(&db, member.id, day(7), MealType::Lunch, false).await?;

        assert_eq!(row.lunch, 0.0);
        let stored = get_meal(&db, member.id, day(7)).await?.unwrap();
        assert_eq!(MealRecord::from(stored).total(), 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_sum_meals_for_member_is_month_scoped() -> Result<()> {
        let db = setup_test_db().await?;
        let rafi = create_test_member(&db, "Rafi").await?;
        let tanvir = create_test_member(&db, "Tanvir").await?;

        record_full_day(&db, rafi.id, day(1)).await?; // 2.5
        record_full_day(&db, rafi.id, day(31)).await?; // 2.5
        toggle_meal(&db, rafi.id, day(15), MealType::Lunch, true).await?; // 1.0
        record_full_day(&db, tanvir.id, day(2)).await?;

        // Neighbouring months must not leak in
        let july_end = NaiveDate::from_ymd_opt(2025, 7, 31).unwrap();
        let september = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        record_full_day(&db, rafi.id, july_end).await?;
        record_full_day(&db, rafi.id, september).await?;

        let august = Period::new(2025, 8)?;
        assert_eq!(sum_meals_for_member(&db, rafi.id, august).await?, 6.0);
        assert_eq!(sum_meals_for_member(&db, tanvir.id, august).await?, 2.5);

        let june = Period::new(2025, 6)?;
        assert_eq!(sum_meals_for_member(&db, rafi.id, june).await?, 0.0);
        Ok(())
    }
}
