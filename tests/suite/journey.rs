//! Journey lifecycle against the file store, reopened from disk between steps.

use std::sync::Arc;

use checkin_core::{FileKeyValueStore, Journey, JourneyError, JourneyStore};
use checkin_types::{
    Address, CheckInProof, DayNumber, FeeSchedule, HabitCategory, JourneyState, Lamports,
    RecordMode, TodaySlot, TxSignature, ValidationError,
};

use crate::common::{date, morning, open_journey};

fn proof(tag: u8, fee: Lamports) -> CheckInProof {
    CheckInProof {
        signature: TxSignature::new([tag; 64]),
        fee_paid: fee,
        mint_address: Some(Address::new([tag; 32])),
    }
}

#[test]
fn read_scenario_from_first_day() {
    let dir = tempfile::tempdir().unwrap();
    let start = date(2024, 1, 1);
    let fees = FeeSchedule::default();

    let mut journey = open_journey(dir.path());
    journey
        .create("Read", HabitCategory::Study, start, morning(start))
        .unwrap();
    assert_eq!(journey.current_day_number(start), Some(DayNumber::FIRST));
    assert_eq!(fees.fee(DayNumber::FIRST), FeeSchedule::DEFAULT_MIN);

    journey
        .record_check_in(
            DayNumber::FIRST,
            proof(1, fees.fee(DayNumber::FIRST)),
            RecordMode::RejectCompleted,
        )
        .unwrap();

    // A fresh process sees the same journey.
    let journey = open_journey(dir.path());
    match journey.today_slot(start) {
        TodaySlot::Done(slot) => {
            assert_eq!(slot.day(), DayNumber::FIRST);
            assert_eq!(slot.proof().unwrap().signature, TxSignature::new([1; 64]));
        }
        other => panic!("expected a completed slot, got {other:?}"),
    }
    assert_eq!(
        journey.current_day_number(date(2024, 1, 2)),
        DayNumber::new(2).ok()
    );
    assert_eq!(journey.progress().completed, 1);
    assert_eq!(journey.progress().percentage, 8);
}

#[test]
fn missed_days_then_advance_keeps_history() {
    let dir = tempfile::tempdir().unwrap();
    let start = date(2024, 1, 1);
    let mut journey = open_journey(dir.path());
    journey
        .create("Run", HabitCategory::Running, start, morning(start))
        .unwrap();
    journey
        .record_check_in(
            DayNumber::FIRST,
            proof(1, FeeSchedule::DEFAULT_MIN),
            RecordMode::RejectCompleted,
        )
        .unwrap();

    // Day 2 was 2024-01-02; nothing was done until the 5th.
    let later = date(2024, 1, 5);
    assert_eq!(journey.current_day_number(later), DayNumber::new(5).ok());
    assert!(journey.advance_to(later).unwrap());

    let journey = open_journey(dir.path());
    let habit = journey.habit().unwrap();
    assert_eq!(habit.slot(DayNumber::FIRST).date(), start);
    for (offset, slot) in habit.check_ins()[1..].iter().enumerate() {
        assert_eq!(slot.date(), later + chrono::Days::new(offset as u64));
        assert!(!slot.is_completed());
    }
    assert_eq!(journey.current_day_number(later), DayNumber::new(2).ok());
}

#[test]
fn completion_is_time_based() {
    let dir = tempfile::tempdir().unwrap();
    let start = date(2024, 3, 1);
    let mut journey = open_journey(dir.path());
    journey
        .create("Sketch", HabitCategory::Creative, start, morning(start))
        .unwrap();

    let last = date(2024, 3, 12);
    assert_eq!(
        journey.state(last),
        JourneyState::ActiveUncompletedToday(DayNumber::LAST)
    );
    assert!(journey.is_complete(date(2024, 3, 13)));
    assert_eq!(journey.state(date(2024, 3, 13)), JourneyState::Complete);
    assert_eq!(journey.progress().completed, 0);
}

#[test]
fn second_journey_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    let start = date(2024, 1, 1);
    let mut journey = open_journey(dir.path());
    journey
        .create("Read", HabitCategory::Study, start, morning(start))
        .unwrap();
    let err = journey
        .create("Write", HabitCategory::Creative, start, morning(start))
        .unwrap_err();
    assert!(matches!(
        err,
        JourneyError::Validation(ValidationError::HabitExists)
    ));

    journey.delete().unwrap();
    assert!(open_journey(dir.path()).habit().is_none());
}

#[test]
fn corrupted_file_is_reported_not_replaced() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("daily-checkin-habit.json"), "{not json").unwrap();
    let kv = FileKeyValueStore::open(dir.path()).unwrap();
    let err = Journey::open(JourneyStore::new(Arc::new(kv))).unwrap_err();
    assert!(err.is_persistence());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("daily-checkin-habit.json")).unwrap(),
        "{not json"
    );
}
