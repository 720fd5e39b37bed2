//! Deposit business logic - Money members hand to the mess.
//!
//! A deposit is two writes that must land together: the deposit row is appended and
//! the member's cached `given_amount` is increased by the same amount. Both happen
//! inside one database transaction, and the increment is a single
//! `UPDATE members SET given_amount = given_amount + ?` so two deposits racing on the
//! same member cannot lose an update.

use crate::{
    core::validation::require_positive_amount,
    entities::{Deposit, Member, deposit, member},
    errors::{Error, Result},
};
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Description used when the caller gives none
pub const DEFAULT_DEPOSIT_DESCRIPTION: &str = "Deposit";

/// Description of the deposit created together with a new member
pub const INITIAL_DEPOSIT_DESCRIPTION: &str = "Initial Deposit";

/// Records a deposit for a member and raises their running total.
///
/// A blank or missing description becomes [`DEFAULT_DEPOSIT_DESCRIPTION`].
///
/// # Returns
/// The stored deposit and the member with the updated `given_amount`.
///
/// # Errors
/// Returns an error if:
/// - The amount is not positive and finite
/// - The member does not exist
/// - Either write fails, in which case neither is kept
#[instrument(skip(db, description))]
pub async fn add_deposit(
    db: &DatabaseConnection,
    member_id: i64,
    amount: f64,
    description: Option<String>,
) -> Result<(deposit::Model, member::Model)> {
    let amount = require_positive_amount(amount)?;
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| DEFAULT_DEPOSIT_DESCRIPTION.to_string());

    let txn = db.begin().await?;

    Member::find_by_id(member_id)
        .one(&txn)
        .await?
        .ok_or(Error::MemberNotFound { id: member_id })?;

    let deposit = insert_deposit(&txn, member_id, amount, description).await?;
    let member = increment_given_amount(&txn, member_id, amount).await?;

    txn.commit().await?;

    info!(
        "Recorded deposit {} of {:.2} for member {}; total given {:.2}",
        deposit.id, amount, member_id, member.given_amount
    );
    Ok((deposit, member))
}

/// Appends a deposit row without touching the member total.
///
/// Only for use inside a transaction that also adjusts `given_amount`.
pub(crate) async fn insert_deposit<C>(
    db: &C,
    member_id: i64,
    amount: f64,
    description: String,
) -> Result<deposit::Model>
where
    C: ConnectionTrait,
{
    deposit::ActiveModel {
        member_id: Set(member_id),
        amount: Set(amount),
        timestamp: Set(chrono::Utc::now()),
        description: Set(description),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Atomically adds `amount_delta` to a member's `given_amount`.
///
/// Performs `UPDATE members SET given_amount = given_amount + amount_delta` rather
/// than read-modify-write.
///
/// # Returns
/// The updated member model
pub async fn increment_given_amount<C>(
    db: &C,
    member_id: i64,
    amount_delta: f64,
) -> Result<member::Model>
where
    C: ConnectionTrait,
{
    let result = Member::update_many()
        .col_expr(
            member::Column::GivenAmount,
            Expr::col(member::Column::GivenAmount).add(amount_delta),
        )
        .filter(member::Column::Id.eq(member_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::MemberNotFound { id: member_id });
    }

    Member::find_by_id(member_id)
        .one(db)
        .await?
        .ok_or(Error::MemberNotFound { id: member_id })
}

/// Retrieves a member's deposits, newest first.
pub async fn get_deposits_for_member<C>(db: &C, member_id: i64) -> Result<Vec<deposit::Model>>
where
    C: ConnectionTrait,
{
    Deposit::find()
        .filter(deposit::Column::MemberId.eq(member_id))
        .order_by_desc(deposit::Column::Timestamp)
        .order_by_desc(deposit::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sum of all deposit rows for a member; 0.0 when there are none.
pub async fn sum_deposits_for_member<C>(db: &C, member_id: i64) -> Result<f64>
where
    C: ConnectionTrait,
{
    let total: Option<Option<f64>> = Deposit::find()
        .select_only()
        .column_as(
            SimpleExpr::from(Func::sum(Expr::col(deposit::Column::Amount))),
            "total",
        )
        .filter(deposit::Column::MemberId.eq(member_id))
        .into_tuple()
        .one(db)
        .await?;

    Ok(total.flatten().unwrap_or(0.0))
}
