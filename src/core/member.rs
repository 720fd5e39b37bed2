//! Member business logic - Creating, editing and removing mess members.
//!
//! Removing a member removes their deposits and meal records with them, inside one
//! transaction.

use crate::{
    config::members::MemberConfig,
    core::{
        deposit::{INITIAL_DEPOSIT_DESCRIPTION, insert_deposit, sum_deposits_for_member},
        validation::{require_positive_amount, require_text},
    },
    entities::{Deposit, Meal, Member, deposit, meal, member},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument, warn};

/// Retrieves all members ordered alphabetically by name.
pub async fn get_all_members<C>(db: &C) -> Result<Vec<member::Model>>
where
    C: ConnectionTrait,
{
    Member::find()
        .order_by_asc(member::Column::Name)
        .order_by_asc(member::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a member by id.
pub async fn get_member_by_id<C>(db: &C, member_id: i64) -> Result<Option<member::Model>>
where
    C: ConnectionTrait,
{
    Member::find_by_id(member_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a member by exact name.
pub async fn get_member_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<member::Model>> {
    Member::find()
        .filter(member::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a member with no deposits yet.
///
/// # Errors
/// Returns an error if the name is blank or the insert fails.
pub async fn create_member(
    db: &DatabaseConnection,
    name: String,
    contact: String,
) -> Result<member::Model> {
    let name = require_text("name", &name)?;

    let member = member::ActiveModel {
        name: Set(name),
        contact: Set(contact.trim().to_string()),
        given_amount: Set(0.0),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Created member {} ({})", member.id, member.name);
    Ok(member)
}

/// Creates a member together with their first deposit.
///
/// The member row starts with `given_amount = amount` and an "Initial Deposit"
/// row is recorded; both are committed together.
///
/// # Errors
/// Returns an error if the name is blank, the amount is not positive, or either
/// insert fails.
#[instrument(skip(db, contact))]
pub async fn create_member_with_initial_deposit(
    db: &DatabaseConnection,
    name: String,
    contact: String,
    amount: f64,
) -> Result<(member::Model, deposit::Model)> {
    let name = require_text("name", &name)?;
    let amount = require_positive_amount(amount)?;

    let txn = db.begin().await?;

    let member = member::ActiveModel {
        name: Set(name),
        contact: Set(contact.trim().to_string()),
        given_amount: Set(amount),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let deposit =
        insert_deposit(&txn, member.id, amount, INITIAL_DEPOSIT_DESCRIPTION.to_string()).await?;

    txn.commit().await?;

    info!(
        "Created member {} ({}) with initial deposit {:.2}",
        member.id, member.name, amount
    );
    Ok((member, deposit))
}

/// Edits a member's name and contact.
///
/// `given_amount` is not editable here; it only moves with deposits.
pub async fn update_member_details(
    db: &DatabaseConnection,
    member_id: i64,
    name: String,
    contact: String,
) -> Result<member::Model> {
    let name = require_text("name", &name)?;

    let existing = get_member_by_id(db, member_id)
        .await?
        .ok_or(Error::MemberNotFound { id: member_id })?;

    let mut active_model: member::ActiveModel = existing.into();
    active_model.name = Set(name);
    active_model.contact = Set(contact.trim().to_string());
    let updated = active_model.update(db).await?;

    debug!("Updated details of member {member_id}");
    Ok(updated)
}

/// Deletes a member and everything recorded against them.
#[instrument(skip(db))]
pub async fn delete_member(db: &DatabaseConnection, member_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let member = get_member_by_id(&txn, member_id)
        .await?
        .ok_or(Error::MemberNotFound { id: member_id })?;

    let meals = Meal::delete_many()
        .filter(meal::Column::MemberId.eq(member_id))
        .exec(&txn)
        .await?;
    let deposits = Deposit::delete_many()
        .filter(deposit::Column::MemberId.eq(member_id))
        .exec(&txn)
        .await?;
    member.delete(&txn).await?;

    txn.commit().await?;

    info!(
        "Deleted member {member_id} with {} deposits and {} meal records",
        deposits.rows_affected, meals.rows_affected
    );
    Ok(())
}

/// Recomputes a member's `given_amount` from their deposit rows and stores it.
///
/// Repairs the cached total if it ever drifted from the deposit history.
pub async fn reconcile_given_amount(
    db: &DatabaseConnection,
    member_id: i64,
) -> Result<member::Model> {
    let txn = db.begin().await?;

    let member = get_member_by_id(&txn, member_id)
        .await?
        .ok_or(Error::MemberNotFound { id: member_id })?;
    let actual = sum_deposits_for_member(&txn, member_id).await?;
    let drift = actual - member.given_amount;

    let member = if drift.abs() > f64::EPSILON {
        warn!(
            "Member {member_id} given_amount {:.2} differs from deposits {:.2}; repairing",
            member.given_amount, actual
        );
        let mut active_model: member::ActiveModel = member.into();
        active_model.given_amount = Set(actual);
        active_model.update(&txn).await?
    } else {
        member
    };

    txn.commit().await?;
    Ok(member)
}

/// Creates configured members that do not exist yet (matched by name).
///
/// A positive `initial_deposit` is recorded as the member's initial deposit.
///
/// # Returns
/// The number of members created
pub async fn seed_members(db: &DatabaseConnection, members: &[MemberConfig]) -> Result<usize> {
    let mut created = 0;

    for config in members {
        if get_member_by_name(db, &config.name).await?.is_some() {
            debug!("Member '{}' already exists, not seeding", config.name);
            continue;
        }

        if config.initial_deposit > 0.0 {
            create_member_with_initial_deposit(
                db,
                config.name.clone(),
                config.contact.clone(),
                config.initial_deposit,
            )
            .await?;
        } else {
            create_member(db, config.name.clone(), config.contact.clone()).await?;
        }
        created += 1;
    }

    if created > 0 {
        info!("Seeded {created} members from configuration");
    }
    Ok(created)
}
