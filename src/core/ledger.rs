//! Ledger handle - The in-process entry point to the mess ledger.
//!
//! [`Ledger`] bundles the database connection with the change bus. Every mutation
//! goes through the per-entity functions in `core` and, once it has committed,
//! publishes a [`LedgerChange`] so live views ([`SummaryWatcher`],
//! [`DepositSubscription`]) refresh. Reads are plain pass-throughs.
//!
//! The handle is cheap to clone; clones share the connection pool and the bus.

use crate::{
    config::members::MemberConfig,
    core::{
        bazar, deposit,
        events::{LedgerChange, LedgerEvents},
        meal::{self, MealRecord, MealType},
        member,
        period::Period,
        settlement::{self, FinalReport},
        subscription::DepositSubscription,
        summary::SummaryWatcher,
        utility,
    },
    entities,
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use tokio::sync::broadcast;

/// Shared handle to the ledger store and its change notifications.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: DatabaseConnection,
    events: LedgerEvents,
}

impl Ledger {
    /// Wraps a connection whose tables already exist.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_events(db, LedgerEvents::new())
    }

    /// Wraps a connection and publishes changes on an existing bus.
    #[must_use]
    pub const fn with_events(db: DatabaseConnection, events: LedgerEvents) -> Self {
        Self { db, events }
    }

    /// Underlying connection, for callers that need the free functions directly.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Receiver for changes committed from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerChange> {
        self.events.subscribe()
    }

    // ---- Members ----

    /// All members, ordered by name.
    pub async fn list_members(&self) -> Result<Vec<entities::MemberModel>> {
        member::get_all_members(&self.db).await
    }

    /// One member by id.
    pub async fn get_member(&self, member_id: i64) -> Result<Option<entities::MemberModel>> {
        member::get_member_by_id(&self.db, member_id).await
    }

    /// Adds a member with no deposits.
    pub async fn add_member(&self, name: String, contact: String) -> Result<entities::MemberModel> {
        let created = member::create_member(&self.db, name, contact).await?;
        self.events.publish(LedgerChange::Members);
        Ok(created)
    }

    /// Adds a member together with their first deposit.
    pub async fn add_member_with_initial_deposit(
        &self,
        name: String,
        contact: String,
        amount: f64,
    ) -> Result<(entities::MemberModel, entities::DepositModel)> {
        let (created, initial) =
            member::create_member_with_initial_deposit(&self.db, name, contact, amount).await?;
        self.events.publish(LedgerChange::Members);
        self.events.publish(LedgerChange::Deposits {
            member_id: created.id,
        });
        Ok((created, initial))
    }

    /// Edits a member's name and contact.
    pub async fn update_member_details(
        &self,
        member_id: i64,
        name: String,
        contact: String,
    ) -> Result<entities::MemberModel> {
        let updated = member::update_member_details(&self.db, member_id, name, contact).await?;
        self.events.publish(LedgerChange::Members);
        Ok(updated)
    }

    /// Deletes a member with their deposits and meals.
    pub async fn delete_member(&self, member_id: i64) -> Result<()> {
        member::delete_member(&self.db, member_id).await?;
        self.events.publish(LedgerChange::MemberDeleted { member_id });
        Ok(())
    }

    /// Rebuilds a member's running deposit total from their deposit rows.
    pub async fn reconcile_given_amount(&self, member_id: i64) -> Result<entities::MemberModel> {
        let reconciled = member::reconcile_given_amount(&self.db, member_id).await?;
        self.events.publish(LedgerChange::Members);
        Ok(reconciled)
    }

    /// Inserts configured members that do not exist yet. Returns how many were added.
    pub async fn seed_members(&self, members: &[MemberConfig]) -> Result<usize> {
        let added = member::seed_members(&self.db, members).await?;
        if added > 0 {
            self.events.publish(LedgerChange::Members);
        }
        Ok(added)
    }

    // ---- Deposits ----

    /// Records a deposit and returns it with the member's new total.
    pub async fn add_deposit(
        &self,
        member_id: i64,
        amount: f64,
        description: Option<String>,
    ) -> Result<(entities::DepositModel, entities::MemberModel)> {
        let saved = deposit::add_deposit(&self.db, member_id, amount, description).await?;
        self.events.publish(LedgerChange::Deposits { member_id });
        Ok(saved)
    }

    /// A member's deposits, newest first.
    pub async fn deposits_for_member(&self, member_id: i64) -> Result<Vec<entities::DepositModel>> {
        deposit::get_deposits_for_member(&self.db, member_id).await
    }

    // ---- Bazar ----

    /// Records a bazar purchase made now.
    pub async fn add_bazar(&self, amount: f64, description: String) -> Result<entities::BazarModel> {
        self.add_bazar_at(amount, description, Utc::now()).await
    }

    /// Records a bazar purchase at a given time.
    pub async fn add_bazar_at(
        &self,
        amount: f64,
        description: String,
        timestamp: DateTime<Utc>,
    ) -> Result<entities::BazarModel> {
        let entry = bazar::add_bazar_at(&self.db, amount, description, timestamp).await?;
        self.events.publish(LedgerChange::Bazar);
        Ok(entry)
    }

    /// Deletes a bazar entry.
    pub async fn delete_bazar(&self, bazar_id: i64) -> Result<()> {
        bazar::delete_bazar(&self.db, bazar_id).await?;
        self.events.publish(LedgerChange::Bazar);
        Ok(())
    }

    /// A month's bazar entries, newest first.
    pub async fn bazar_for_month(&self, period: Period) -> Result<Vec<entities::BazarModel>> {
        bazar::get_bazar_for_month(&self.db, period).await
    }

    /// Total bazar spending in a month.
    pub async fn sum_bazar(&self, period: Period) -> Result<f64> {
        bazar::sum_bazar(&self.db, period).await
    }

    // ---- Meals ----

    /// A member's meal record for a day, if any.
    pub async fn get_meal(&self, member_id: i64, date: NaiveDate) -> Result<Option<MealRecord>> {
        Ok(meal::get_meal(&self.db, member_id, date)
            .await?
            .map(MealRecord::from))
    }

    /// Stores a whole meal record, replacing any record for the same member and day.
    pub async fn upsert_meal(&self, record: &MealRecord) -> Result<MealRecord> {
        let saved = meal::upsert_meal(&self.db, record).await?;
        self.events.publish(LedgerChange::Meals { date: saved.date });
        Ok(saved.into())
    }

    /// Ticks or unticks one meal slot.
    pub async fn toggle_meal(
        &self,
        member_id: i64,
        date: NaiveDate,
        meal_type: MealType,
        is_checked: bool,
    ) -> Result<MealRecord> {
        let saved = meal::toggle_meal(&self.db, member_id, date, meal_type, is_checked).await?;
        self.events.publish(LedgerChange::Meals { date });
        Ok(saved.into())
    }

    /// Every member's meal record for a day.
    pub async fn meals_for_date(&self, date: NaiveDate) -> Result<Vec<MealRecord>> {
        Ok(meal::get_meals_for_date(&self.db, date)
            .await?
            .into_iter()
            .map(MealRecord::from)
            .collect())
    }

    /// A member's meal count for a month.
    pub async fn sum_meals_for_member(&self, member_id: i64, period: Period) -> Result<f64> {
        meal::sum_meals_for_member(&self.db, member_id, period).await
    }

    // ---- Utility bills ----

    /// Creates a bill for `period` when `bill_id` is `None`, otherwise edits that bill.
    pub async fn save_utility_bill(
        &self,
        bill_id: Option<i64>,
        period: Period,
        name: String,
        amount: f64,
    ) -> Result<entities::UtilityBillModel> {
        let bill = utility::save_utility_bill(&self.db, bill_id, period, name, amount).await?;
        self.events.publish(LedgerChange::UtilityBills);
        Ok(bill)
    }

    /// Deletes a utility bill.
    pub async fn delete_utility_bill(&self, bill_id: i64) -> Result<()> {
        utility::delete_utility_bill(&self.db, bill_id).await?;
        self.events.publish(LedgerChange::UtilityBills);
        Ok(())
    }

    /// A month's utility bills.
    pub async fn utility_bills_for_month(
        &self,
        period: Period,
    ) -> Result<Vec<entities::UtilityBillModel>> {
        utility::get_utility_bills_for_month(&self.db, period).await
    }

    /// Total utility cost in a month.
    pub async fn sum_utility_bills(&self, period: Period) -> Result<f64> {
        utility::sum_utility_bills(&self.db, period).await
    }

    // ---- Reports ----

    /// Computes the settlement statement for a month.
    pub async fn report(&self, period: Period) -> Result<FinalReport> {
        settlement::generate_report(&self.db, period).await
    }

    /// Starts a watcher that keeps the statement for the selected month current.
    #[must_use]
    pub fn watch_summary(&self, period: Period) -> SummaryWatcher {
        SummaryWatcher::spawn(self.db.clone(), &self.events, period)
    }

    /// Follows a member's deposit history until the returned handle is dropped.
    ///
    /// # Errors
    /// Returns `Error::MemberNotFound` if the member does not exist.
    pub async fn watch_deposits(&self, member_id: i64) -> Result<DepositSubscription> {
        if self.get_member(member_id).await?.is_none() {
            return Err(Error::MemberNotFound { id: member_id });
        }
        DepositSubscription::start(self.db.clone(), &self.events, member_id).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_mutations_publish_changes() -> Result<()> {
        let ledger = setup_test_ledger().await?;
        let mut rx = ledger.subscribe();

        let member = ledger.add_member("Rafi".to_string(), String::new()).await?;
        ledger.add_deposit(member.id, 200.0, None).await?;
        let date = NaiveDate::from_ymd_opt(2025, 8, 3).unwrap();
        ledger.toggle_meal(member.id, date, MealType::Dinner, true).await?;
        ledger.add_bazar(80.0, "Eggs".to_string()).await?;
        let august = Period::new(2025, 8)?;
        ledger
            .save_utility_bill(None, august, "Internet".to_string(), 50.0)
            .await?;
        ledger.delete_member(member.id).await?;

        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(timeout(WAIT, rx.recv()).await.unwrap().unwrap());
        }
        assert_eq!(
            seen,
            [
                LedgerChange::Members,
                LedgerChange::Deposits {
                    member_id: member.id
                },
                LedgerChange::Meals { date },
                LedgerChange::Bazar,
                LedgerChange::UtilityBills,
                LedgerChange::MemberDeleted {
                    member_id: member.id
                },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_mutation_publishes_nothing() -> Result<()> {
        let ledger = setup_test_ledger().await?;
        let mut rx = ledger.subscribe();

        assert!(ledger.add_deposit(42, 10.0, None).await.is_err());
        assert!(ledger.add_bazar(-1.0, "Oops".to_string()).await.is_err());

        assert!(rx.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_meal_roundtrip_through_ledger() -> Result<()> {
        let ledger = setup_test_ledger().await?;
        let member = ledger.add_member("A".to_string(), String::new()).await?;
        let date = NaiveDate::from_ymd_opt(2025, 8, 3).unwrap();

        assert!(ledger.get_meal(member.id, date).await?.is_none());

        let mut record = MealRecord::empty(member.id, date);
        record.lunch = MealType::Lunch.points();
        ledger.upsert_meal(&record).await?;
        ledger
            .toggle_meal(member.id, date, MealType::Breakfast, true)
            .await?;

        let stored = ledger.get_meal(member.id, date).await?.unwrap();
        assert_eq!(stored.breakfast, 0.5);
        assert_eq!(stored.lunch, 1.0);
        assert_eq!(stored.dinner, 0.0);

        let day = ledger.meals_for_date(date).await?;
        assert_eq!(day.len(), 1);
        let period = Period::from_date(date);
        assert_eq!(ledger.sum_meals_for_member(member.id, period).await?, 1.5);
        Ok(())
    }

    #[tokio::test]
    async fn test_watch_deposits_unknown_member() -> Result<()> {
        let ledger = setup_test_ledger().await?;
        let result = ledger.watch_deposits(7).await;
        assert!(matches!(result, Err(Error::MemberNotFound { id: 7 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_initial_deposit_member_via_ledger() -> Result<()> {
        let ledger = setup_test_ledger().await?;
        let (member, initial) = ledger
            .add_member_with_initial_deposit("B".to_string(), "017".to_string(), 250.0)
            .await?;

        assert_eq!(member.given_amount, 250.0);
        let deposits = ledger.deposits_for_member(member.id).await?;
        assert_eq!(deposits, vec![initial]);
        assert_eq!(ledger.list_members().await?.len(), 1);
        Ok(())
    }
}
