//! Check-in orchestration.
//!
//! Ties the journey service to the ledger: choose today's day, build and
//! submit the commitment transaction, wait for confirmation, and only then
//! record the day.

mod error;
mod orchestrator;
mod pending;
mod phase;

pub use error::CheckInError;
pub use orchestrator::{
    CheckInReceipt, DEFAULT_CONFIRM_TIMEOUT, Orchestrator, OrchestratorOptions, RecoveryOutcome,
};
pub use pending::{PENDING_KEY, PendingCheckIn, PendingStatus};
pub use phase::CheckInPhase;
