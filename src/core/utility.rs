//! Utility bill business logic - Monthly shared bills.
//!
//! A bill's month is fixed when it is created and never recomputed.

use crate::{
    core::{
        period::Period,
        validation::{require_positive_amount, require_text},
    },
    entities::{UtilityBill, utility_bill},
    errors::{Error, Result},
};
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use tracing::info;

/// Adds a bill to `period`.
///
/// # Errors
/// Returns an error if the name is blank, the amount is not positive,
/// or the insert fails.
pub async fn add_utility_bill(
    db: &DatabaseConnection,
    period: Period,
    name: String,
    amount: f64,
) -> Result<utility_bill::Model> {
    let name = require_text("name", &name)?;
    let amount = require_positive_amount(amount)?;

    let bill = utility_bill::ActiveModel {
        month_year: Set(period.key()),
        name: Set(name),
        amount: Set(amount),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Added utility bill '{}' of {:.2} to {}", bill.name, amount, period);
    Ok(bill)
}

/// Changes a bill's name and amount. Its month stays as created.
pub async fn update_utility_bill(
    db: &DatabaseConnection,
    bill_id: i64,
    name: String,
    amount: f64,
) -> Result<utility_bill::Model> {
    let name = require_text("name", &name)?;
    let amount = require_positive_amount(amount)?;

    let existing = UtilityBill::find_by_id(bill_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "utility bill",
            id: bill_id,
        })?;

    let mut active_model: utility_bill::ActiveModel = existing.into();
    active_model.name = Set(name);
    active_model.amount = Set(amount);
    active_model.update(db).await.map_err(Into::into)
}

/// Inserts a new bill when `bill_id` is `None`, otherwise updates that bill.
pub async fn save_utility_bill(
    db: &DatabaseConnection,
    bill_id: Option<i64>,
    period: Period,
    name: String,
    amount: f64,
) -> Result<utility_bill::Model> {
    match bill_id {
        Some(id) => update_utility_bill(db, id, name, amount).await,
        None => add_utility_bill(db, period, name, amount).await,
    }
}

/// Deletes one bill.
pub async fn delete_utility_bill(db: &DatabaseConnection, bill_id: i64) -> Result<()> {
    let result = UtilityBill::delete_by_id(bill_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "utility bill",
            id: bill_id,
        });
    }
    info!("Deleted utility bill {bill_id}");
    Ok(())
}

/// Lists a month's bills, most recently added first.
pub async fn get_utility_bills_for_month(
    db: &DatabaseConnection,
    period: Period,
) -> Result<Vec<utility_bill::Model>> {
    UtilityBill::find()
        .filter(utility_bill::Column::MonthYear.eq(period.key()))
        .order_by_desc(utility_bill::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Total of a month's bills; 0.0 when there are none.
pub async fn sum_utility_bills(db: &DatabaseConnection, period: Period) -> Result<f64> {
    let total: Option<Option<f64>> = UtilityBill::find()
        .select_only()
        .column_as(
            SimpleExpr::from(Func::sum(Expr::col(utility_bill::Column::Amount))),
            "total",
        )
        .filter(utility_bill::Column::MonthYear.eq(period.key()))
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

    #[tokio::test]
    async fn test_add_utility_bill_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let period = Period::new(2025, 8).unwrap();

        let result = add_utility_bill(&db, period, String::new(), 10.0).await;
        assert!(matches!(result, Err(Error::BlankField { field: "name" })));

        let result = add_utility_bill(&db, period, "WiFi".to_string(), 0.0).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_bills_are_month_scoped() -> Result<()> {
        let db = setup_test_db().await?;
        let august = Period::new(2025, 8)?;

        add_utility_bill(&db, august, "Gas Bill".to_string(), 1080.0).await?;
        add_utility_bill(&db, august, "WiFi".to_string(), 800.0).await?;
        add_utility_bill(&db, august.next(), "Gas Bill".to_string(), 1100.0).await?;

        assert_eq!(sum_utility_bills(&db, august).await?, 1880.0);
        assert_eq!(sum_utility_bills(&db, august.next()).await?, 1100.0);
        assert_eq!(sum_utility_bills(&db, august.previous()).await?, 0.0);

        let bills = get_utility_bills_for_month(&db, august).await?;
        let names: Vec<&str> = bills.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["WiFi", "Gas Bill"]);
        assert!(bills.iter().all(|b| b.month_year == "2025-08"));
        Ok(())
    }

    #[tokio::test]
    async fn test_save_utility_bill_upserts_by_id() -> Result<()> {
        let db = setup_test_db().await?;
        let august = Period::new(2025, 8)?;

        let bill = save_utility_bill(&db, None, august, "Electricity".to_string(), 900.0).await?;
        // Month argument is ignored on update: the bill keeps its original month
        let updated = save_utility_bill(
            &db,
            Some(bill.id),
            august.next(),
            "Electricity".to_string(),
            950.0,
        )
        .await?;

        assert_eq!(updated.id, bill.id);
        assert_eq!(updated.amount, 950.0);
        assert_eq!(updated.month_year, "2025-08");
        assert_eq!(sum_utility_bills(&db, august).await?, 950.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_utility_bill() -> Result<()> {
        let db = setup_test_db().await?;
        let august = Period::new(2025, 8)?;
        let bill = add_utility_bill(&db, august, "Water".to_string(), 200.0).await?;

        delete_utility_bill(&db, bill.id).await?;
        assert_eq!(sum_utility_bills(&db, august).await?, 0.0);
        assert!(matches!(
            delete_utility_bill(&db, bill.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
