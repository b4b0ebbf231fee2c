//! Full check-ins through the orchestrator with the in-process ledger and the
//! file store.

use std::sync::Arc;
use std::time::Duration;

use checkin_chain::{ConfirmBehavior, SignatureStatus, SubmissionError};
use checkin_engine::{CheckInError, CheckInPhase, OrchestratorOptions, RecoveryOutcome};
use checkin_types::{DayNumber, FeeSchedule, HabitCategory, JourneyState};

use crate::common::{
    date, funded_ledger, habit_file, morning, open_journey, orchestrator, treasury,
};

#[tokio::test]
async fn twelve_days_with_escalating_fees() {
    let dir = tempfile::tempdir().unwrap();
    let start = date(2024, 1, 1);
    let mut journey = open_journey(dir.path());
    journey
        .create("Read", HabitCategory::Study, start, morning(start))
        .unwrap();
    let ledger = funded_ledger();
    let orchestrator = orchestrator(journey, ledger.clone(), OrchestratorOptions::default());
    let fees = FeeSchedule::default();

    let mut previous_fee = None;
    for (offset, day) in DayNumber::all().enumerate() {
        let today = start + chrono::Days::new(offset as u64);
        let receipt = orchestrator.check_in(today, morning(today)).await.unwrap();
        assert_eq!(receipt.day, day);
        assert_eq!(receipt.fee, fees.fee(day));
        assert!(previous_fee.is_none_or(|prev| prev <= receipt.fee));
        previous_fee = Some(receipt.fee);
        assert_eq!(receipt.badge.metadata.name, format!("Day {day}: Read"));
    }

    let last_day = date(2024, 1, 12);
    assert_eq!(previous_fee, Some(FeeSchedule::DEFAULT_MAX));
    assert_eq!(
        orchestrator.journey().await.state(last_day),
        JourneyState::Complete
    );

    // The day-12 transaction pays the maximum fee to the treasury.
    let submitted = ledger.submitted();
    assert_eq!(submitted.len(), 12);
    let wire = submitted.last().unwrap();
    assert!(wire.windows(32).any(|w| w == treasury().to_bytes().as_slice()));
    assert!(wire.windows(8).any(|w| w == 80_000_000u64.to_le_bytes()));

    let reopened = open_journey(dir.path());
    let habit = reopened.habit().unwrap();
    assert_eq!(habit.progress().percentage, 100);
    assert!(habit.check_ins().iter().all(|slot| {
        slot.proof()
            .is_some_and(|proof| proof.mint_address.is_some())
    }));
}

#[tokio::test]
async fn timeout_leaves_habit_file_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let start = date(2024, 1, 1);
    let mut journey = open_journey(dir.path());
    journey
        .create("Read", HabitCategory::Study, start, morning(start))
        .unwrap();
    let before = habit_file(dir.path());

    let ledger = funded_ledger();
    ledger.set_confirm_behavior(ConfirmBehavior::Hang);
    let orchestrator = orchestrator(
        journey,
        ledger,
        OrchestratorOptions {
            confirm_timeout: Duration::from_millis(30),
            ..OrchestratorOptions::default()
        },
    );

    let err = orchestrator.check_in(start, morning(start)).await.unwrap_err();
    assert!(matches!(
        err,
        CheckInError::Submission(SubmissionError::TimedOut(_))
    ));
    assert_eq!(habit_file(dir.path()), before);
    assert_eq!(orchestrator.phase(), CheckInPhase::Idle);
}

#[tokio::test]
async fn restart_after_cancel_recovers_landed_check_in() {
    let dir = tempfile::tempdir().unwrap();
    let start = date(2024, 1, 1);
    let mut journey = open_journey(dir.path());
    journey
        .create("Read", HabitCategory::Study, start, morning(start))
        .unwrap();
    let before = habit_file(dir.path());

    let ledger = funded_ledger();
    ledger.set_confirm_behavior(ConfirmBehavior::Hang);
    let first = Arc::new(orchestrator(
        journey,
        ledger.clone(),
        OrchestratorOptions::default(),
    ));
    let mut phases = first.subscribe();
    let task = {
        let first = Arc::clone(&first);
        tokio::spawn(async move { first.check_in(start, morning(start)).await })
    };
    phases
        .wait_for(|phase| *phase == CheckInPhase::Submitted)
        .await
        .unwrap();
    task.abort();
    let _ = task.await;
    let signature = first.pending().unwrap().unwrap().signature.unwrap();
    drop(first);
    assert_eq!(habit_file(dir.path()), before);

    // The transaction landed while nobody was watching.
    ledger.set_signature_status(signature, SignatureStatus::Confirmed);
    ledger.set_confirm_behavior(ConfirmBehavior::Confirm);

    let second = orchestrator(
        open_journey(dir.path()),
        ledger,
        OrchestratorOptions::default(),
    );
    assert_eq!(
        second.recover().await.unwrap(),
        RecoveryOutcome::Committed {
            day: DayNumber::FIRST,
            signature,
        }
    );
    assert!(second.pending().unwrap().is_none());

    let reopened = open_journey(dir.path());
    let slot = reopened.habit().unwrap().slot(DayNumber::FIRST);
    assert_eq!(slot.proof().unwrap().signature, signature);
}

#[tokio::test]
async fn check_in_settles_leftover_before_starting() {
    let dir = tempfile::tempdir().unwrap();
    let start = date(2024, 1, 1);
    let mut journey = open_journey(dir.path());
    journey
        .create("Read", HabitCategory::Study, start, morning(start))
        .unwrap();

    let ledger = funded_ledger();
    ledger.set_confirm_behavior(ConfirmBehavior::Hang);
    let first = orchestrator(
        journey,
        ledger.clone(),
        OrchestratorOptions {
            confirm_timeout: Duration::from_millis(30),
            ..OrchestratorOptions::default()
        },
    );
    assert!(first.check_in(start, morning(start)).await.is_err());
    let signature = first.pending().unwrap().unwrap().signature.unwrap();
    drop(first);

    // It never landed and its blockhash has expired; the next check-in
    // drops it and goes ahead.
    ledger.set_signature_status(signature, SignatureStatus::Unknown);
    ledger.set_block_height(151);
    ledger.set_confirm_behavior(ConfirmBehavior::Confirm);
    let second = orchestrator(
        open_journey(dir.path()),
        ledger.clone(),
        OrchestratorOptions::default(),
    );
    let receipt = second.check_in(start, morning(start)).await.unwrap();
    assert_eq!(receipt.day, DayNumber::FIRST);
    assert_ne!(receipt.signature, signature);
    assert_eq!(ledger.submitted().len(), 2);
}
