use chrono::NaiveDate;
use thiserror::Error;

use crate::DayNumber;

/// Input rejected before any IO happens.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("habit name must not be empty")]
    EmptyName,
    #[error("habit name is {actual} characters; the limit is {max}")]
    NameTooLong { max: usize, actual: usize },
    #[error("unknown habit category: {0}")]
    UnknownCategory(String),
    #[error("day {0} is outside the 12-day journey")]
    DayOutOfRange(u8),
    #[error("no active habit")]
    NoHabit,
    #[error("a habit is already active")]
    HabitExists,
    #[error("day {0} is already checked in")]
    AlreadyCompleted(DayNumber),
    #[error("no check-in is open for {0}")]
    NothingEligible(NaiveDate),
    #[error("date arithmetic overflowed from {0}")]
    DateOutOfRange(NaiveDate),
}

/// A persisted record that breaks the journey's structural invariants.
///
/// These are never coerced into shape: the operation stops and the record is
/// left for inspection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("journey has {actual} check-in slots, expected {expected}")]
    SlotCount { expected: usize, actual: usize },
    #[error("slot {index} carries day number {found}")]
    DayNumbering { index: usize, found: u8 },
    #[error("day {day} is marked completed={completed} but its proof fields disagree")]
    ProofMismatch { day: u8, completed: bool },
}
