//! Bazar business logic - Shared grocery spending.
//!
//! Entries are bucketed into periods by the UTC calendar month of their timestamp.

use crate::{
    core::{
        period::Period,
        validation::{require_positive_amount, require_text},
    },
    entities::{Bazar, bazar},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use tracing::info;

/// Records a bazar purchase made now.
///
/// # Errors
/// Returns an error if the amount is not positive, the description is blank,
/// or the insert fails.
pub async fn add_bazar(
    db: &DatabaseConnection,
    amount: f64,
    description: String,
) -> Result<bazar::Model> {
    add_bazar_at(db, amount, description, Utc::now()).await
}

/// Records a bazar purchase with an explicit timestamp, e.g. a receipt entered late.
pub async fn add_bazar_at(
    db: &DatabaseConnection,
    amount: f64,
    description: String,
    timestamp: DateTime<Utc>,
) -> Result<bazar::Model> {
    let amount = require_positive_amount(amount)?;
    let description = require_text("description", &description)?;

    let entry = bazar::ActiveModel {
        amount: Set(amount),
        description: Set(description),
        timestamp: Set(timestamp),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        "Recorded bazar {} of {:.2} for {}",
        entry.id,
        amount,
        Period::from_timestamp(timestamp)
    );
    Ok(entry)
}

/// Deletes one bazar entry.
pub async fn delete_bazar(db: &DatabaseConnection, bazar_id: i64) -> Result<()> {
    let result = Bazar::delete_by_id(bazar_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "bazar entry",
            id: bazar_id,
        });
    }
    info!("Deleted bazar entry {bazar_id}");
    Ok(())
}

/// Lists the entries of one month, newest first.
pub async fn get_bazar_for_month(
    db: &DatabaseConnection,
    period: Period,
) -> Result<Vec<bazar::Model>> {
    Bazar::find()
        .filter(bazar::Column::Timestamp.gte(period.start_utc()))
        .filter(bazar::Column::Timestamp.lt(period.end_utc()))
        .order_by_desc(bazar::Column::Timestamp)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Total bazar spending in a month; 0.0 when nothing was bought.
pub async fn sum_bazar(db: &DatabaseConnection, period: Period) -> Result<f64> {
    let total: Option<Option<f64>> = Bazar::find()
        .select_only()
        .column_as(
            SimpleExpr::from(Func::sum(Expr::col(bazar::Column::Amount))),
            "total",
        )
        .filter(bazar::Column::Timestamp.gte(period.start_utc()))
        .filter(bazar::Column::Timestamp.lt(period.end_utc()))
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
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_add_bazar_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = add_bazar(&db, -5.0, "Rice".to_string()).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        let result = add_bazar(&db, 5.0, "  ".to_string()).await;
        assert!(matches!(
            result,
            Err(Error::BlankField {
                field: "description"
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_sum_bazar_is_month_scoped() -> Result<()> {
        let db = setup_test_db().await?;
        let at = |m, d, h| Utc.with_ymd_and_hms(2025, m, d, h, 0, 0).unwrap();

        add_bazar_at(&db, 120.0, "Rice".to_string(), at(8, 1, 0)).await?;
        add_bazar_at(&db, 80.5, "Fish".to_string(), at(8, 31, 23)).await?;
        add_bazar_at(&db, 999.0, "July oil".to_string(), at(7, 31, 23)).await?;
        add_bazar_at(&db, 555.0, "September eggs".to_string(), at(9, 1, 0)).await?;

        let august = Period::new(2025, 8)?;
        assert_eq!(sum_bazar(&db, august).await?, 200.5);

        let entries = get_bazar_for_month(&db, august).await?;
        let descriptions: Vec<&str> = entries.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descriptions, ["Fish", "Rice"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_sum_bazar_empty_month_is_zero() -> Result<()> {
        let db = setup_test_db().await?;
        assert_eq!(sum_bazar(&db, Period::new(2024, 2)?).await?, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_bazar() -> Result<()> {
        let db = setup_test_db().await?;
        let entry = add_bazar(&db, 40.0, "Vegetables".to_string()).await?;

        delete_bazar(&db, entry.id).await?;
        assert_eq!(sum_bazar(&db, Period::current()).await?, 0.0);

        let again = delete_bazar(&db, entry.id).await;
        assert!(matches!(again, Err(Error::NotFound { .. })));
        Ok(())
    }
}
