//! The stateful journey service.
//!
//! Owns the in-memory habit and the store that persists it. Every mutation is
//! applied to a copy, persisted, and only then swapped in, so a failed save
//! leaves both the stored value and the in-memory value as they were.

use checkin_types::{
    CheckInProof, DayNumber, Habit, HabitCategory, HabitName, JourneyState, Progress, RecordMode,
    TodaySlot, ValidationError,
};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::{JourneyError, JourneyStore};

#[derive(Debug)]
pub struct Journey {
    store: JourneyStore,
    habit: Option<Habit>,
}

impl Journey {
    /// Load whatever the store holds.
    pub fn open(store: JourneyStore) -> Result<Self, JourneyError> {
        let habit = store.load()?;
        if let Some(habit) = &habit {
            info!(habit = %habit.name(), start = %habit.start_date(), "Loaded journey");
        }
        Ok(Self { store, habit })
    }

    #[must_use]
    pub fn habit(&self) -> Option<&Habit> {
        self.habit.as_ref()
    }

    #[must_use]
    pub fn store(&self) -> &JourneyStore {
        &self.store
    }

    fn require(&self) -> Result<&Habit, ValidationError> {
        self.habit.as_ref().ok_or(ValidationError::NoHabit)
    }

    /// Start a new journey dated from `today`.
    pub fn create(
        &mut self,
        name: &str,
        category: HabitCategory,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<&Habit, JourneyError> {
        if self.habit.is_some() {
            return Err(ValidationError::HabitExists.into());
        }
        let name = HabitName::new(name)?;
        let habit = Habit::create(name, category, today, now)?;
        self.store.save(&habit)?;
        info!(habit = %habit.name(), %category, start = %today, "Started journey");
        Ok(self.habit.insert(habit))
    }

    #[must_use]
    pub fn today_slot(&self, today: NaiveDate) -> TodaySlot<'_> {
        self.habit
            .as_ref()
            .map_or(TodaySlot::NoEligibleDay, |h| h.today_slot(today))
    }

    #[must_use]
    pub fn current_day_number(&self, today: NaiveDate) -> Option<DayNumber> {
        self.today_slot(today).day_number()
    }

    /// Attach on-chain proof to `day` and persist.
    pub fn record_check_in(
        &mut self,
        day: DayNumber,
        proof: CheckInProof,
        mode: RecordMode,
    ) -> Result<(), JourneyError> {
        let mut next = self.require()?.clone();
        let signature = proof.signature;
        next.record_check_in(day, proof, mode)?;
        self.commit(next)?;
        info!(%day, %signature, "Recorded check-in");
        Ok(())
    }

    /// Re-date the remaining days so the next one is due `today`.
    ///
    /// Persists only when a date actually moved. Without a habit this is a
    /// no-op.
    pub fn advance_to(&mut self, today: NaiveDate) -> Result<bool, JourneyError> {
        let Some(current) = &self.habit else {
            return Ok(false);
        };
        let mut next = current.clone();
        if !next.advance_to(today)? {
            return Ok(false);
        }
        self.commit(next)?;
        info!(%today, "Advanced journey");
        Ok(true)
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.habit
            .as_ref()
            .map_or_else(Progress::empty, Habit::progress)
    }

    #[must_use]
    pub fn is_complete(&self, today: NaiveDate) -> bool {
        self.habit.as_ref().is_some_and(|h| h.is_complete(today))
    }

    #[must_use]
    pub fn state(&self, today: NaiveDate) -> JourneyState {
        JourneyState::of(self.habit.as_ref(), today)
    }

    /// Clear the store, then forget the habit.
    ///
    /// If clearing fails the in-memory habit is kept.
    pub fn delete(&mut self) -> Result<(), JourneyError> {
        self.store.clear()?;
        if let Some(habit) = self.habit.take() {
            info!(habit = %habit.name(), "Deleted journey");
        }
        Ok(())
    }

    fn commit(&mut self, next: Habit) -> Result<(), JourneyError> {
        if let Err(err) = self.store.save(&next) {
            warn!(error = %err, "Journey save failed; keeping previous state");
            return Err(err.into());
        }
        self.habit = Some(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use checkin_types::{Address, Lamports, TxSignature};

    use super::*;
    use crate::{HABIT_KEY, MemoryKeyValueStore};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn proof(tag: u8) -> CheckInProof {
        CheckInProof {
            signature: TxSignature::new([tag; 64]),
            fee_paid: Lamports::new(10_000_000),
            mint_address: Some(Address::new([tag; 32])),
        }
    }

    fn journey() -> (Arc<MemoryKeyValueStore>, Journey) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let journey = Journey::open(JourneyStore::new(kv.clone())).unwrap();
        (kv, journey)
    }

    #[test]
    fn create_persists_and_rejects_second() {
        let (kv, mut journey) = journey();
        let start = date(2024, 1, 1);
        journey
            .create("  Read  ", HabitCategory::Study, start, Utc::now())
            .unwrap();
        assert_eq!(journey.habit().unwrap().name().as_str(), "Read");

        let reopened = Journey::open(JourneyStore::new(kv)).unwrap();
        assert_eq!(reopened.habit(), journey.habit());

        let err = journey
            .create("Run", HabitCategory::Running, start, Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            JourneyError::Validation(ValidationError::HabitExists)
        ));
    }

    #[test]
    fn create_validates_name() {
        let (_, mut journey) = journey();
        let err = journey
            .create("   ", HabitCategory::Other, date(2024, 1, 1), Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            JourneyError::Validation(ValidationError::EmptyName)
        ));
        let long = "x".repeat(51);
        assert!(
            journey
                .create(&long, HabitCategory::Other, date(2024, 1, 1), Utc::now())
                .is_err()
        );
        assert!(journey.habit().is_none());
    }

    #[test]
    fn record_without_habit_fails() {
        let (_, mut journey) = journey();
        let err = journey
            .record_check_in(DayNumber::FIRST, proof(1), RecordMode::default())
            .unwrap_err();
        assert!(matches!(err, JourneyError::Validation(ValidationError::NoHabit)));
        assert_eq!(journey.progress(), Progress::empty());
        assert_eq!(journey.state(date(2024, 1, 1)), JourneyState::NoHabit);
        assert!(!journey.advance_to(date(2024, 1, 1)).unwrap());
    }

    #[test]
    fn failed_record_keeps_memory_and_store() {
        let (kv, mut journey) = journey();
        journey
            .create("Read", HabitCategory::Study, date(2024, 1, 1), Utc::now())
            .unwrap();
        let before_mem = journey.habit().cloned();
        let before_disk = kv.raw(HABIT_KEY);

        kv.fail_writes(true);
        let err = journey
            .record_check_in(DayNumber::FIRST, proof(1), RecordMode::default())
            .unwrap_err();
        assert!(err.is_persistence());
        assert_eq!(journey.habit().cloned(), before_mem);
        assert_eq!(kv.raw(HABIT_KEY), before_disk);
    }

    #[test]
    fn advance_persists_only_on_change() {
        let (kv, mut journey) = journey();
        let start = date(2024, 1, 1);
        journey
            .create("Read", HabitCategory::Study, start, Utc::now())
            .unwrap();

        // Nothing completed: no write even when writes would fail.
        kv.fail_writes(true);
        assert!(!journey.advance_to(start).unwrap());
        kv.fail_writes(false);

        journey
            .record_check_in(DayNumber::FIRST, proof(1), RecordMode::default())
            .unwrap();
        assert!(journey.advance_to(start).unwrap());
        assert_eq!(journey.current_day_number(start), Some(DayNumber::new(2).unwrap()));

        let reopened = Journey::open(JourneyStore::new(kv)).unwrap();
        assert_eq!(reopened.habit(), journey.habit());
    }

    #[test]
    fn failed_delete_keeps_habit() {
        let (kv, mut journey) = journey();
        journey
            .create("Read", HabitCategory::Study, date(2024, 1, 1), Utc::now())
            .unwrap();

        kv.fail_writes(true);
        assert!(journey.delete().is_err());
        assert!(journey.habit().is_some());

        kv.fail_writes(false);
        journey.delete().unwrap();
        assert!(journey.habit().is_none());
        assert!(kv.raw(HABIT_KEY).is_none());
    }

    #[test]
    fn open_surfaces_read_failure() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.fail_reads(true);
        let err = Journey::open(JourneyStore::new(kv)).unwrap_err();
        assert!(err.is_persistence());
    }
}
