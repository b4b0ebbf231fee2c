//! The habit journey aggregate and its pure state-machine rules.
//!
//! Every rule takes "today" explicitly. Nothing in here reads a clock or
//! touches storage; persistence lives in `checkin-core`.
//!
//! # Journey states
//!
//! ```text
//!              create                      check-in recorded
//! NoHabit ───────────────> ActiveUncompletedToday ──────────> ActiveCompletedToday
//!    ^                        ^          │                         │
//!    │ delete                 │ advance  │ date passes, no slot    │ date passes
//!    │                        │          v                         v
//!    └──────────────────── ActiveDisabled <────────────────────────┘
//!                                        │ slot 12's date arrives
//!                                        v
//!                                     Complete
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Address, DayNumber, HabitId, HabitName, InvariantViolation, Lamports, TOTAL_DAYS, TxSignature,
    ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitCategory {
    Study,
    Workout,
    Running,
    Social,
    Health,
    Creative,
    Other,
}

impl HabitCategory {
    pub const ALL: [Self; 7] = [
        Self::Study,
        Self::Workout,
        Self::Running,
        Self::Social,
        Self::Health,
        Self::Creative,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Study => "study",
            Self::Workout => "workout",
            Self::Running => "running",
            Self::Social => "social",
            Self::Health => "health",
            Self::Creative => "creative",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Study => "Study",
            Self::Workout => "Workout",
            Self::Running => "Running",
            Self::Social => "Social",
            Self::Health => "Health",
            Self::Creative => "Creative",
            Self::Other => "Other",
        }
    }
}

impl FromStr for HabitCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| ValidationError::UnknownCategory(s.trim().to_string()))
    }
}

impl fmt::Display for HabitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// On-chain evidence attached to a completed day.
///
/// The fields only exist together, so a day can never be "completed" with a
/// signature but no fee, or vice versa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInProof {
    pub signature: TxSignature,
    pub fee_paid: Lamports,
    pub mint_address: Option<Address>,
}

/// Whether recording a check-in may replace an existing proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordMode {
    /// Re-marking a completed day is an error.
    #[default]
    RejectCompleted,
    /// Replace the existing proof (manual correction).
    Overwrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "CheckInRecord")]
pub struct CheckInDay {
    day: DayNumber,
    date: NaiveDate,
    proof: Option<CheckInProof>,
}

impl CheckInDay {
    fn new(day: DayNumber, date: NaiveDate) -> Self {
        Self {
            day,
            date,
            proof: None,
        }
    }

    #[must_use]
    pub const fn day(&self) -> DayNumber {
        self.day
    }

    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.proof.is_some()
    }

    #[must_use]
    pub const fn proof(&self) -> Option<&CheckInProof> {
        self.proof.as_ref()
    }
}

/// Wire shape of a slot: flat optional fields, as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRecord {
    day_number: u8,
    date: NaiveDate,
    completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transaction_signature: Option<TxSignature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fee_paid: Option<Lamports>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mint_address: Option<Address>,
}

impl From<CheckInDay> for CheckInRecord {
    fn from(value: CheckInDay) -> Self {
        let completed = value.is_completed();
        let (transaction_signature, fee_paid, mint_address) = match value.proof {
            Some(proof) => (Some(proof.signature), Some(proof.fee_paid), proof.mint_address),
            None => (None, None, None),
        };
        Self {
            day_number: value.day.get(),
            date: value.date,
            completed,
            transaction_signature,
            fee_paid,
            mint_address,
        }
    }
}

impl CheckInRecord {
    fn into_slot(self, index: usize) -> Result<CheckInDay, InvariantViolation> {
        let day = DayNumber::new(self.day_number)
            .ok()
            .filter(|day| day.index() == index)
            .ok_or(InvariantViolation::DayNumbering {
                index,
                found: self.day_number,
            })?;

        let proof = match (self.completed, self.transaction_signature, self.fee_paid) {
            (true, Some(signature), Some(fee_paid)) => Some(CheckInProof {
                signature,
                fee_paid,
                mint_address: self.mint_address,
            }),
            (false, None, None) if self.mint_address.is_none() => None,
            (completed, ..) => {
                return Err(InvariantViolation::ProofMismatch {
                    day: self.day_number,
                    completed,
                });
            }
        };

        Ok(CheckInDay {
            day,
            date: self.date,
            proof,
        })
    }
}

/// Which slot, if any, the user acts on today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodaySlot<'a> {
    /// No slot is dated today.
    NoEligibleDay,
    /// Today's slot is waiting for a check-in.
    Open(&'a CheckInDay),
    /// Every slot dated today is already checked in; this is the last one.
    Done(&'a CheckInDay),
}

impl<'a> TodaySlot<'a> {
    #[must_use]
    pub fn day(&self) -> Option<&'a CheckInDay> {
        match *self {
            Self::NoEligibleDay => None,
            Self::Open(day) | Self::Done(day) => Some(day),
        }
    }

    #[must_use]
    pub fn day_number(&self) -> Option<DayNumber> {
        self.day().map(CheckInDay::day)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percentage: u8,
}

impl Progress {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            completed: 0,
            total: TOTAL_DAYS,
            percentage: 0,
        }
    }

    fn from_completed(completed: usize) -> Self {
        // Round half-up; 100k/12 never lands exactly on .5 anyway.
        let percentage = (completed * 100 + TOTAL_DAYS / 2) / TOTAL_DAYS;
        Self {
            completed,
            total: TOTAL_DAYS,
            percentage: percentage as u8,
        }
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.total - self.completed
    }
}

/// Coarse journey state for a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JourneyState {
    NoHabit,
    ActiveUncompletedToday(DayNumber),
    ActiveCompletedToday(DayNumber),
    /// A habit exists but no slot is dated today.
    ActiveDisabled,
    /// The final slot's date has arrived or passed and nothing is open today.
    Complete,
}

impl JourneyState {
    #[must_use]
    pub fn of(habit: Option<&Habit>, today: NaiveDate) -> Self {
        let Some(habit) = habit else {
            return Self::NoHabit;
        };
        match habit.today_slot(today) {
            TodaySlot::Open(day) => Self::ActiveUncompletedToday(day.day()),
            _ if habit.is_complete(today) => Self::Complete,
            TodaySlot::Done(day) => Self::ActiveCompletedToday(day.day()),
            TodaySlot::NoEligibleDay => Self::ActiveDisabled,
        }
    }
}

fn add_days(date: NaiveDate, days: usize) -> Result<NaiveDate, ValidationError> {
    date.checked_add_days(Days::new(days as u64))
        .ok_or(ValidationError::DateOutOfRange(date))
}

/// The single active 12-day commitment.
///
/// # Invariants
///
/// - exactly [`TOTAL_DAYS`] slots, slot `i` carries day `i + 1`
/// - a slot's proof fields are all present or all absent
///
/// Both are checked again when a record is deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HabitRecord", into = "HabitRecord")]
pub struct Habit {
    id: HabitId,
    name: HabitName,
    category: HabitCategory,
    start_date: NaiveDate,
    check_ins: [CheckInDay; TOTAL_DAYS],
    created_at: DateTime<Utc>,
}

/// Persisted shape of a [`Habit`] before its invariants are checked.
///
/// Decoding into this first lets a loader tell malformed JSON apart from a
/// well-formed record that breaks the 12-slot structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitRecord {
    id: HabitId,
    name: HabitName,
    category: HabitCategory,
    start_date: NaiveDate,
    check_ins: Vec<CheckInRecord>,
    created_at: DateTime<Utc>,
}

impl From<Habit> for HabitRecord {
    fn from(value: Habit) -> Self {
        Self {
            id: value.id,
            name: value.name,
            category: value.category,
            start_date: value.start_date,
            check_ins: value.check_ins.into_iter().map(CheckInRecord::from).collect(),
            created_at: value.created_at,
        }
    }
}

impl TryFrom<HabitRecord> for Habit {
    type Error = InvariantViolation;

    fn try_from(raw: HabitRecord) -> Result<Self, Self::Error> {
        let actual = raw.check_ins.len();
        let slots = raw
            .check_ins
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.into_slot(index))
            .collect::<Result<Vec<_>, _>>()?;
        let check_ins = <[CheckInDay; TOTAL_DAYS]>::try_from(slots).map_err(|_| {
            InvariantViolation::SlotCount {
                expected: TOTAL_DAYS,
                actual,
            }
        })?;
        Ok(Self {
            id: raw.id,
            name: raw.name,
            category: raw.category,
            start_date: raw.start_date,
            check_ins,
            created_at: raw.created_at,
        })
    }
}

impl Habit {
    /// Start a journey on `today` with slots dated `today ..= today + 11`.
    pub fn create(
        name: HabitName,
        category: HabitCategory,
        today: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        add_days(today, TOTAL_DAYS - 1)?;
        let check_ins = std::array::from_fn(|i| {
            // Cannot overflow: the furthest offset was checked above.
            let date = today + Days::new(i as u64);
            CheckInDay::new(DayNumber::from_index(i), date)
        });
        Ok(Self {
            id: HabitId::generate(),
            name,
            category,
            start_date: today,
            check_ins,
            created_at,
        })
    }

    #[must_use]
    pub const fn id(&self) -> HabitId {
        self.id
    }

    #[must_use]
    pub const fn name(&self) -> &HabitName {
        &self.name
    }

    #[must_use]
    pub const fn category(&self) -> HabitCategory {
        self.category
    }

    #[must_use]
    pub const fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn check_ins(&self) -> &[CheckInDay] {
        &self.check_ins
    }

    #[must_use]
    pub fn slot(&self, day: DayNumber) -> &CheckInDay {
        &self.check_ins[day.index()]
    }

    /// Prefer an open slot dated today; otherwise the last completed slot
    /// dated today. Several slots can share a date after [`Habit::advance_to`].
    #[must_use]
    pub fn today_slot(&self, today: NaiveDate) -> TodaySlot<'_> {
        if let Some(open) = self
            .check_ins
            .iter()
            .find(|slot| slot.date == today && !slot.is_completed())
        {
            return TodaySlot::Open(open);
        }
        self.check_ins
            .iter()
            .rev()
            .find(|slot| slot.date == today && slot.is_completed())
            .map_or(TodaySlot::NoEligibleDay, TodaySlot::Done)
    }

    #[must_use]
    pub fn current_day_number(&self, today: NaiveDate) -> Option<DayNumber> {
        self.today_slot(today).day_number()
    }

    /// Attach `proof` to `day`.
    ///
    /// With [`RecordMode::RejectCompleted`] a completed day is left untouched
    /// and [`ValidationError::AlreadyCompleted`] is returned.
    pub fn record_check_in(
        &mut self,
        day: DayNumber,
        proof: CheckInProof,
        mode: RecordMode,
    ) -> Result<(), ValidationError> {
        let slot = &mut self.check_ins[day.index()];
        if slot.is_completed() && mode == RecordMode::RejectCompleted {
            return Err(ValidationError::AlreadyCompleted(day));
        }
        slot.proof = Some(proof);
        Ok(())
    }

    fn last_completed_index(&self) -> Option<usize> {
        self.check_ins.iter().rposition(CheckInDay::is_completed)
    }

    /// Pull the next unchecked day forward so it is due `today`.
    ///
    /// Slots after the last completed one are re-dated `today, today + 1, ...`.
    /// Slots up to and including the last completed one keep their dates.
    /// Returns whether any date changed; with nothing completed, or the final
    /// day completed, this is a no-op.
    pub fn advance_to(&mut self, today: NaiveDate) -> Result<bool, ValidationError> {
        let Some(last) = self.last_completed_index() else {
            return Ok(false);
        };
        if last >= TOTAL_DAYS - 1 {
            return Ok(false);
        }

        // Resolve every new date before touching a slot.
        let dates = (0..TOTAL_DAYS - last - 1)
            .map(|offset| add_days(today, offset))
            .collect::<Result<Vec<_>, _>>()?;

        let mut changed = false;
        for (slot, date) in self.check_ins[last + 1..].iter_mut().zip(dates) {
            if slot.date != date {
                slot.date = date;
                changed = true;
            }
        }
        Ok(changed)
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress::from_completed(self.check_ins.iter().filter(|s| s.is_completed()).count())
    }

    /// True once the final slot's date is on or before `today`, whether or
    /// not any day was actually checked in.
    #[must_use]
    pub fn is_complete(&self, today: NaiveDate) -> bool {
        self.check_ins[TOTAL_DAYS - 1].date <= today
    }

    #[must_use]
    pub fn state(&self, today: NaiveDate) -> JourneyState {
        JourneyState::of(Some(self), today)
    }
}
