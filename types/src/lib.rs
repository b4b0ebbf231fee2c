//! Domain types for Daily Check-In: the habit aggregate, its twelve slots,
//! the fee schedule and ledger identifiers.
//!
//! Pure rules only. Persistence lives in `checkin-core`, the ledger in
//! `checkin-chain`.

mod error;
mod fee;
mod habit;
mod ids;
mod ledger;
mod proofs;

pub use error::{InvariantViolation, ValidationError};
pub use fee::{
    ESTIMATED_NETWORK_COST, FEE_ROUNDING_UNIT, FeeSchedule, FeeScheduleError, LAMPORTS_PER_SOL,
    Lamports, can_afford,
};
pub use habit::{
    CheckInDay, CheckInProof, CheckInRecord, Habit, HabitCategory, HabitRecord, JourneyState,
    Progress, RecordMode, TodaySlot,
};
pub use ids::HabitId;
pub use ledger::{Address, ParseLedgerIdError, TxSignature};
pub use proofs::{DayNumber, HabitName, MAX_HABIT_NAME_CHARS, TOTAL_DAYS};
