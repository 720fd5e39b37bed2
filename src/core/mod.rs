/// Bazar (shared grocery) entries
pub mod bazar;
/// Deposits and the running `given_amount` total
pub mod deposit;
/// Change notifications published after ledger writes
pub mod events;
/// Cloneable handle over the store and the change bus
pub mod ledger;
/// Daily meal records and the checkbox toggle
pub mod meal;
/// Member lifecycle
pub mod member;
/// `YYYY-MM` month keys and navigation
pub mod period;
/// Monthly settlement computation and formatting
pub mod settlement;
/// Live per-member deposit history
pub mod subscription;
/// Recomputed statement for a selected month
pub mod summary;
/// Monthly utility bills
pub mod utility;
/// Shared input checks
pub mod validation;
