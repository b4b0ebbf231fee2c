use checkin_chain::{LedgerError, SubmissionError, TransactionBuildError};
use checkin_core::{JourneyError, PersistenceError};
use checkin_types::{Address, DayNumber, Lamports, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckInError {
    #[error("no check-in is due today")]
    NoEligibleDay,
    #[error("day {0} is already checked in")]
    AlreadyDone(DayNumber),
    #[error("balance {balance} does not cover the {required} this check-in needs")]
    InsufficientBalance {
        balance: Lamports,
        required: Lamports,
    },
    #[error("a check-in is already in progress")]
    CheckInInFlight,
    #[error("check-in for day {day} (badge {mint}) is still unresolved on the ledger")]
    Unresolved { day: DayNumber, mint: Address },
    #[error("balance check failed: {0}")]
    Balance(#[source] LedgerError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Journey(#[from] JourneyError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Build(#[from] TransactionBuildError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

impl CheckInError {
    /// Retrying later, with a fresh transaction, may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Build(_) | Self::Submission(_) | Self::Balance(_) | Self::CheckInInFlight
        )
    }
}
