//! Summary watcher - Keeps the statement for a selected month up to date.
//!
//! The selected [`Period`] lives in a `watch` channel. A driver task computes the
//! report for it and publishes a [`SummaryState`] into a second single-slot channel.
//! When the selection changes, or a relevant ledger change arrives, while a
//! computation is still running, that computation is dropped and a new one starts
//! for the latest request. Selecting the month that is already selected does nothing.

use crate::{
    core::{
        events::{LedgerChange, LedgerEvents},
        period::Period,
        settlement::{FinalReport, generate_report},
    },
    errors::Result,
};
use sea_orm::DatabaseConnection;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    watch,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Progress of the report for the selected month.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportStatus {
    /// A computation is running
    Loading,
    /// The latest computed report
    Ready(FinalReport),
    /// The computation failed; holds the error message
    Failed(String),
}

/// What an observer of the summary sees.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryState {
    /// Month this state belongs to
    pub period: Period,
    /// Report progress for that month
    pub status: ReportStatus,
}

impl SummaryState {
    /// The report, if ready.
    #[must_use]
    pub const fn report(&self) -> Option<&FinalReport> {
        match &self.status {
            ReportStatus::Ready(report) => Some(report),
            _ => None,
        }
    }

    const fn is_settled(&self) -> bool {
        !matches!(self.status, ReportStatus::Loading)
    }
}

/// Month selection plus the continuously recomputed report for it.
#[derive(Debug)]
pub struct SummaryWatcher {
    period_tx: watch::Sender<Period>,
    state_rx: watch::Receiver<SummaryState>,
    task: JoinHandle<()>,
}

impl SummaryWatcher {
    /// Starts watching `initial`, recomputing whenever `events` reports a change
    /// that can affect the selected month.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(db: DatabaseConnection, events: &LedgerEvents, initial: Period) -> Self {
        let (period_tx, period_rx) = watch::channel(initial);
        let (state_tx, state_rx) = watch::channel(SummaryState {
            period: initial,
            status: ReportStatus::Loading,
        });
        let changes = events.subscribe();

        let task = tokio::spawn(drive(db, period_rx, changes, state_tx));
        info!("Summary watcher started for {initial}");

        Self {
            period_tx,
            state_rx,
            task,
        }
    }

    /// Selects a month. Returns `false` if it was already selected.
    pub fn select(&self, period: Period) -> bool {
        self.period_tx.send_if_modified(|selected| {
            if *selected == period {
                false
            } else {
                *selected = period;
                true
            }
        })
    }

    /// Moves the selection by `delta` months and returns the new selection.
    pub fn change_month(&self, delta: i32) -> Period {
        self.period_tx.send_if_modified(|selected| {
            let shifted = selected.shift(delta);
            let modified = shifted != *selected;
            *selected = shifted;
            modified
        });
        self.selected_period()
    }

    /// Selects the following month.
    pub fn next_month(&self) -> Period {
        self.change_month(1)
    }

    /// Selects the preceding month.
    pub fn previous_month(&self) -> Period {
        self.change_month(-1)
    }

    /// Currently selected month.
    #[must_use]
    pub fn selected_period(&self) -> Period {
        *self.period_tx.borrow()
    }

    /// Latest published state. It may still belong to the previous selection.
    #[must_use]
    pub fn current(&self) -> SummaryState {
        self.state_rx.borrow().clone()
    }

    /// Receiver for every state the driver publishes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SummaryState> {
        self.state_rx.clone()
    }

    /// Waits until the selected month has a ready or failed state and returns it.
    ///
    /// Returns `None` if the driver has stopped.
    pub async fn settled(&self) -> Option<SummaryState> {
        let period = self.selected_period();
        let mut rx = self.state_rx.clone();
        let state = rx
            .wait_for(|state| state.period == period && state.is_settled())
            .await
            .ok()?;
        Some(state.clone())
    }
}

impl Drop for SummaryWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

enum Interrupt {
    Period,
    Ledger,
    Stop,
}

async fn drive(
    db: DatabaseConnection,
    mut period_rx: watch::Receiver<Period>,
    changes: broadcast::Receiver<LedgerChange>,
    state_tx: watch::Sender<SummaryState>,
) {
    let mut changes = Some(changes);
    let mut period = *period_rx.borrow_and_update();

    loop {
        state_tx.send_replace(SummaryState {
            period,
            status: ReportStatus::Loading,
        });

        let computed = tokio::select! {
            biased;
            interrupt = next_interrupt(&mut period_rx, &mut changes, period) => Err(interrupt),
            result = generate_report(&db, period) => Ok(result),
        };

        let interrupt = match computed {
            Ok(result) => {
                publish(&state_tx, period, result);
                next_interrupt(&mut period_rx, &mut changes, period).await
            }
            Err(interrupt) => {
                debug!("Dropped in-flight report for {period}");
                interrupt
            }
        };

        match interrupt {
            Interrupt::Period => period = *period_rx.borrow_and_update(),
            Interrupt::Ledger => debug!("Ledger changed, recomputing {period}"),
            Interrupt::Stop => break,
        }
    }

    debug!("Summary watcher stopped");
}

fn publish(state_tx: &watch::Sender<SummaryState>, period: Period, result: Result<FinalReport>) {
    let status = match result {
        Ok(report) => ReportStatus::Ready(report),
        Err(e) => {
            error!("Failed to compute report for {period}: {e}");
            ReportStatus::Failed(e.to_string())
        }
    };
    state_tx.send_replace(SummaryState { period, status });
}

/// Resolves when the report for `period` must be recomputed or the driver must stop.
async fn next_interrupt(
    period_rx: &mut watch::Receiver<Period>,
    changes: &mut Option<broadcast::Receiver<LedgerChange>>,
    period: Period,
) -> Interrupt {
    loop {
        tokio::select! {
            biased;
            changed = period_rx.changed() => {
                return if changed.is_ok() { Interrupt::Period } else { Interrupt::Stop };
            }
            change = next_change(changes) => match change {
                Ok(change) if affects(change, period) => return Interrupt::Ledger,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Summary watcher missed {skipped} ledger changes, recomputing");
                    return Interrupt::Ledger;
                }
                Err(RecvError::Closed) => *changes = None,
            },
        }
    }
}

async fn next_change(
    changes: &mut Option<broadcast::Receiver<LedgerChange>>,
) -> std::result::Result<LedgerChange, RecvError> {
    match changes {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn affects(change: LedgerChange, period: Period) -> bool {
    match change {
        LedgerChange::Meals { date } => period.contains(date),
        _ => true,
    }
}
