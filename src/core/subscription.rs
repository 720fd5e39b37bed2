//! Deposit subscription - A live, disposable view of one member's deposit history.
//!
//! A [`DepositSubscription`] owns a background task that re-reads the member's
//! deposits whenever a matching [`LedgerChange`] is published and hands the fresh
//! list to a `watch` channel. Dropping the handle aborts the task, so a subscription
//! can never outlive its owner. [`MemberSelection`] keeps at most one of these alive
//! for the member currently selected.

use crate::{
    core::{
        deposit::get_deposits_for_member,
        events::{LedgerChange, LedgerEvents},
        ledger::Ledger,
    },
    entities::deposit,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use tokio::sync::{broadcast::error::RecvError, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Live deposit list for one member, newest first.
#[derive(Debug)]
pub struct DepositSubscription {
    member_id: i64,
    rx: watch::Receiver<Vec<deposit::Model>>,
    task: JoinHandle<()>,
}

impl DepositSubscription {
    /// Loads the current list and starts following changes.
    ///
    /// The change receiver is taken before the initial read so that no deposit
    /// recorded in between is missed.
    ///
    /// # Errors
    /// Returns `Error::Database` if the initial read fails.
    pub(crate) async fn start(
        db: DatabaseConnection,
        events: &LedgerEvents,
        member_id: i64,
    ) -> Result<Self> {
        let mut changes = events.subscribe();
        let initial = get_deposits_for_member(&db, member_id).await?;
        let (tx, rx) = watch::channel(initial);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = tx.closed() => break,
                    change = changes.recv() => match change {
                        Ok(LedgerChange::MemberDeleted { member_id: id }) if id == member_id => {
                            debug!("Member {member_id} deleted, ending deposit subscription");
                            tx.send_replace(Vec::new());
                            break;
                        }
                        Ok(change) if change.touches_deposits_of(member_id) => {
                            refresh(&db, member_id, &tx).await;
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Deposit subscription for member {member_id} missed {skipped} changes, resyncing");
                            refresh(&db, member_id, &tx).await;
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });

        debug!("Started deposit subscription for member {member_id}");
        Ok(Self {
            member_id,
            rx,
            task,
        })
    }

    /// Member this subscription follows.
    #[must_use]
    pub const fn member_id(&self) -> i64 {
        self.member_id
    }

    /// Latest delivered list.
    #[must_use]
    pub fn current(&self) -> Vec<deposit::Model> {
        self.rx.borrow().clone()
    }

    /// Waits for the next delivery and returns it.
    ///
    /// Returns `None` once the subscription has ended (member deleted, ledger gone).
    pub async fn changed(&mut self) -> Option<Vec<deposit::Model>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// A detached receiver; it stops receiving when this handle is dropped.
    #[must_use]
    pub fn receiver(&self) -> watch::Receiver<Vec<deposit::Model>> {
        self.rx.clone()
    }
}

impl Drop for DepositSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn refresh(
    db: &DatabaseConnection,
    member_id: i64,
    tx: &watch::Sender<Vec<deposit::Model>>,
) {
    match get_deposits_for_member(db, member_id).await {
        Ok(deposits) => {
            tx.send_replace(deposits);
        }
        Err(e) => error!("Failed to refresh deposits for member {member_id}: {e}"),
    }
}

/// The member whose deposit history is currently on display.
#[derive(Debug)]
pub struct MemberSelection {
    ledger: Ledger,
    current: Option<DepositSubscription>,
}

impl MemberSelection {
    /// Starts with nothing selected.
    #[must_use]
    pub const fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            current: None,
        }
    }

    /// Selects a member, disposing of the previous subscription first.
    ///
    /// # Errors
    /// Returns an error if the member does not exist or the initial read fails; the
    /// selection is then empty.
    pub async fn select(&mut self, member_id: i64) -> Result<&mut DepositSubscription> {
        self.current = None;
        let subscription = self.ledger.watch_deposits(member_id).await?;
        Ok(self.current.insert(subscription))
    }

    /// Clears the selection and disposes of its subscription.
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Selected member id, if any.
    #[must_use]
    pub fn selected(&self) -> Option<i64> {
        self.current.as_ref().map(DepositSubscription::member_id)
    }

    /// Subscription for the selected member, if any.
    pub fn deposits(&mut self) -> Option<&mut DepositSubscription> {
        self.current.as_mut()
    }
}
