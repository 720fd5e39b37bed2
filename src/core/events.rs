//! Change notifications - Lets observers re-query after the ledger is written.
//!
//! Every successful mutation made through [`crate::core::ledger::Ledger`] publishes a
//! [`LedgerChange`] on a broadcast channel. Observers (the deposit subscription, the
//! summary watcher) hold a receiver and refresh their view when a relevant change
//! arrives. Publishing never fails: a change with nobody listening is dropped.

use chrono::NaiveDate;
use tokio::sync::broadcast;
use tracing::trace;

/// Default capacity of the change channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// What part of the ledger changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerChange {
    /// A member was created or edited
    Members,
    /// A deposit was recorded for this member
    Deposits {
        /// Member whose deposit history changed
        member_id: i64,
    },
    /// A member and all their rows were removed
    MemberDeleted {
        /// The removed member
        member_id: i64,
    },
    /// A bazar entry was added or removed
    Bazar,
    /// A meal record changed on this day
    Meals {
        /// Day of the changed record
        date: NaiveDate,
    },
    /// A utility bill was added, edited or removed
    UtilityBills,
}

impl LedgerChange {
    /// Whether the change can alter a member's deposit list.
    #[must_use]
    pub const fn touches_deposits_of(&self, id: i64) -> bool {
        matches!(
            self,
            Self::Deposits { member_id } | Self::MemberDeleted { member_id } if *member_id == id
        )
    }
}

/// Broadcast bus for [`LedgerChange`]s.
#[derive(Debug, Clone)]
pub struct LedgerEvents {
    tx: broadcast::Sender<LedgerChange>,
}

impl Default for LedgerEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerEvents {
    /// Creates a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a bus holding at most `capacity` unread changes per receiver.
    ///
    /// Slow receivers that fall further behind observe `RecvError::Lagged`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns a receiver for changes published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerChange> {
        self.tx.subscribe()
    }

    /// Publishes a change to every current receiver.
    pub fn publish(&self, change: LedgerChange) {
        // Err only means nobody is listening
        if self.tx.send(change).is_err() {
            trace!("No receivers for {change:?}");
        }
    }

    /// Number of live receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use tokio::sync::broadcast::error::RecvError;

    #[test]
    fn test_publish_without_receivers_is_silent() {
        let events = LedgerEvents::new();
        events.publish(LedgerChange::Bazar);
        assert_eq!(events.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_receivers_see_changes_in_order() {
        let events = LedgerEvents::new();
        let mut rx = events.subscribe();

        events.publish(LedgerChange::Members);
        events.publish(LedgerChange::Deposits { member_id: 4 });

        assert_eq!(rx.recv().await.unwrap(), LedgerChange::Members);
        assert_eq!(
            rx.recv().await.unwrap(),
            LedgerChange::Deposits { member_id: 4 }
        );
    }

    #[tokio::test]
    async fn test_slow_receiver_lags() {
        let events = LedgerEvents::with_capacity(2);
        let mut rx = events.subscribe();
        for _ in 0..5 {
            events.publish(LedgerChange::UtilityBills);
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(3))));
        assert_eq!(rx.recv().await.unwrap(), LedgerChange::UtilityBills);
    }

    #[test]
    fn test_touches_deposits_of() {
        assert!(LedgerChange::Deposits { member_id: 1 }.touches_deposits_of(1));
        assert!(LedgerChange::MemberDeleted { member_id: 1 }.touches_deposits_of(1));
        assert!(!LedgerChange::Deposits { member_id: 2 }.touches_deposits_of(1));
        assert!(!LedgerChange::Members.touches_deposits_of(1));
    }
}
