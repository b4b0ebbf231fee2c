//! Two-phase check-in: pay and mint on the ledger, then record in the journey.
//!
//! The journey is only touched after the ledger confirms. From just before
//! signing until the commit point a [`PendingCheckIn`] sits in the store so
//! that a crash or a dropped future can be resolved later by
//! [`Orchestrator::recover`]. No fee is paid unless that record was written.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use checkin_chain::badge::BadgeContext;
use checkin_chain::{
    BadgeMetadata, BlockhashContext, CommitmentBuilder, CommitmentTransaction, Confirmation,
    LedgerClient, MintedBadge, SignatureStatus, SubmissionError, TransactionSigner,
};
use checkin_core::{Journey, KeyValueStore};
use checkin_types::{
    Address, CheckInProof, DayNumber, ESTIMATED_NETWORK_COST, FeeSchedule, Lamports, Progress,
    RecordMode, TodaySlot, TxSignature, ValidationError, can_afford,
};
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{info, warn};

use crate::pending::{PendingCheckIn, PendingStatus};
use crate::{CheckInError, CheckInPhase};

pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Upper bound on the wait for ledger confirmation.
    pub confirm_timeout: Duration,
    /// Check the payer can cover the fee before building.
    pub check_balance: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            check_balance: true,
        }
    }
}

/// Result of a committed check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInReceipt {
    pub day: DayNumber,
    pub signature: TxSignature,
    pub fee: Lamports,
    pub badge: MintedBadge,
    pub progress: Progress,
}

/// What happened to a leftover pending record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    NothingPending,
    /// The transaction landed and the day is now recorded.
    Committed {
        day: DayNumber,
        signature: TxSignature,
    },
    /// The transaction did not land, or its journey is gone; the record was
    /// dropped.
    Discarded {
        day: DayNumber,
        mint: Address,
        reason: String,
    },
    /// The transaction may still land: the ledger has seen it below the
    /// required commitment, or its blockhash has not expired yet.
    StillPending { day: DayNumber, mint: Address },
}

/// Holds the in-flight flag for one attempt. Dropping it, including by
/// cancellation, releases the flag and resets an unfinished phase to idle.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
    phase: &'a watch::Sender<CheckInPhase>,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool, phase: &'a watch::Sender<CheckInPhase>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self { flag, phase })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.phase.send_if_modified(|phase| {
            if phase.is_active() {
                *phase = CheckInPhase::Idle;
                true
            } else {
                false
            }
        });
        self.flag.store(false, Ordering::Release);
    }
}

pub struct Orchestrator {
    journey: Mutex<Journey>,
    kv: Arc<dyn KeyValueStore>,
    builder: CommitmentBuilder,
    signer: Arc<dyn TransactionSigner>,
    ledger: Arc<dyn LedgerClient>,
    options: OrchestratorOptions,
    in_flight: AtomicBool,
    phase: watch::Sender<CheckInPhase>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("builder", &self.builder)
            .field("options", &self.options)
            .field("phase", &*self.phase.borrow())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// The pending record shares the journey's backing store.
    #[must_use]
    pub fn new(
        journey: Journey,
        builder: CommitmentBuilder,
        signer: Arc<dyn TransactionSigner>,
        ledger: Arc<dyn LedgerClient>,
        options: OrchestratorOptions,
    ) -> Self {
        let kv = Arc::clone(journey.store().backing());
        let (phase, _) = watch::channel(CheckInPhase::Idle);
        Self {
            journey: Mutex::new(journey),
            kv,
            builder,
            signer,
            ledger,
            options,
            in_flight: AtomicBool::new(false),
            phase,
        }
    }

    /// Exclusive access to the journey for reads and non-payment edits.
    pub async fn journey(&self) -> MutexGuard<'_, Journey> {
        self.journey.lock().await
    }

    #[must_use]
    pub fn phase(&self) -> CheckInPhase {
        *self.phase.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CheckInPhase> {
        self.phase.subscribe()
    }

    #[must_use]
    pub fn fees(&self) -> &FeeSchedule {
        self.builder.fees()
    }

    #[must_use]
    pub fn payer(&self) -> Address {
        self.signer.address()
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn pending(&self) -> Result<Option<PendingCheckIn>, CheckInError> {
        Ok(PendingCheckIn::load(self.kv.as_ref())?)
    }

    fn set_phase(&self, phase: CheckInPhase) {
        self.phase.send_replace(phase);
    }

    /// Check in for the day dated `today`.
    ///
    /// Any leftover pending record is settled first. On success the day is
    /// recorded and the receipt carries the minted badge.
    pub async fn check_in(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<CheckInReceipt, CheckInError> {
        let _guard = InFlightGuard::acquire(&self.in_flight, &self.phase)
            .ok_or(CheckInError::CheckInInFlight)?;
        self.set_phase(CheckInPhase::Idle);

        if let RecoveryOutcome::StillPending { day, mint } = self.settle_pending().await? {
            return Err(CheckInError::Unresolved { day, mint });
        }

        let (habit_id, habit_name, day) = {
            let journey = self.journey.lock().await;
            let habit = journey.habit().ok_or(ValidationError::NoHabit)?;
            let day = match habit.today_slot(today) {
                TodaySlot::Open(slot) => slot.day(),
                TodaySlot::Done(slot) => return Err(CheckInError::AlreadyDone(slot.day())),
                TodaySlot::NoEligibleDay => return Err(CheckInError::NoEligibleDay),
            };
            (habit.id(), habit.name().clone(), day)
        };
        let payer = self.signer.address();
        let fee = self.builder.fees().fee(day);

        if self.options.check_balance {
            let balance = self
                .ledger
                .balance(payer)
                .await
                .map_err(CheckInError::Balance)?;
            if !can_afford(balance, fee) {
                warn!(%day, %balance, %fee, "Balance too low for check-in");
                return Err(CheckInError::InsufficientBalance {
                    balance,
                    required: fee.saturating_add(ESTIMATED_NETWORK_COST),
                });
            }
        }

        self.set_phase(CheckInPhase::Building);
        let built = self.builder.build(payer, day, &habit_name).await?;
        let min_context_slot = built.min_context_slot();
        let CommitmentTransaction {
            transaction,
            mint,
            context,
            ..
        } = built;

        let mut pending = PendingCheckIn {
            habit_id,
            day,
            signature: None,
            mint,
            fee,
            last_valid_block_height: context.last_valid_block_height,
            status: PendingStatus::Submitting,
            started_at: now,
        };
        if let Err(err) = pending.save(self.kv.as_ref()) {
            warn!(%day, %mint, error = %err, "Cannot record check-in; not submitting");
            return Err(err.into());
        }

        let signature = match self
            .signer
            .sign_and_submit(transaction, min_context_slot)
            .await
        {
            Ok(signature) => signature,
            Err(err) if err.never_sent() => {
                self.discard_pending();
                return Err(err.into());
            }
            Err(err) => {
                warn!(%day, %mint, error = %err, "Submission outcome unknown; leaving pending record");
                return Err(err.into());
            }
        };
        self.set_phase(CheckInPhase::Submitted);

        pending.signature = Some(signature);
        pending.status = PendingStatus::Submitted;
        if let Err(err) = pending.save(self.kv.as_ref()) {
            warn!(%day, %signature, error = %err, "Failed to record signature; recovery will look it up by mint");
        }

        match self.await_confirmation(signature, context).await {
            Ok(()) => {}
            Err(err @ (SubmissionError::TimedOut(_) | SubmissionError::Status(_))) => {
                warn!(%day, %signature, error = %err, "Confirmation unresolved; leaving pending record");
                return Err(err.into());
            }
            Err(err) => {
                warn!(%day, %signature, error = %err, "Check-in transaction did not land");
                self.discard_pending();
                return Err(err.into());
            }
        }

        self.set_phase(CheckInPhase::Confirmed);
        pending.status = PendingStatus::Confirmed;
        if let Err(err) = pending.save(self.kv.as_ref()) {
            warn!(%day, %signature, error = %err, "Failed to mark pending check-in confirmed");
        }

        let progress = self.commit(&pending, signature).await?;
        self.set_phase(CheckInPhase::Committed);

        let metadata = BadgeMetadata::generate(
            self.builder.badge(),
            &BadgeContext {
                day,
                habit: &habit_name,
                fee,
                owner: payer,
                treasury: self.builder.treasury(),
                completed_at: now,
            },
        );
        info!(%day, %signature, %mint, %fee, "Check-in committed");
        Ok(CheckInReceipt {
            day,
            signature,
            fee,
            badge: MintedBadge {
                day,
                mint_address: mint,
                transaction_signature: signature,
                minted_at: now,
                metadata,
            },
            progress,
        })
    }

    /// Resolve a pending record left by a crash, a timeout or a cancelled
    /// check-in.
    pub async fn recover(&self) -> Result<RecoveryOutcome, CheckInError> {
        let _guard = InFlightGuard::acquire(&self.in_flight, &self.phase)
            .ok_or(CheckInError::CheckInInFlight)?;
        self.settle_pending().await
    }

    /// Delete the journey, then any pending record.
    ///
    /// If the journey cannot be deleted the pending record is kept.
    pub async fn reset(&self) -> Result<(), CheckInError> {
        let _guard = InFlightGuard::acquire(&self.in_flight, &self.phase)
            .ok_or(CheckInError::CheckInInFlight)?;
        self.journey.lock().await.delete()?;
        PendingCheckIn::clear(self.kv.as_ref())?;
        self.set_phase(CheckInPhase::Idle);
        Ok(())
    }

    async fn await_confirmation(
        &self,
        signature: TxSignature,
        context: BlockhashContext,
    ) -> Result<(), SubmissionError> {
        let timeout = self.options.confirm_timeout;
        let confirmation =
            tokio::time::timeout(timeout, self.ledger.confirm_transaction(signature, context))
                .await
                .map_err(|_| SubmissionError::TimedOut(timeout))?
                .map_err(SubmissionError::Status)?;
        match confirmation {
            Confirmation::Confirmed => Ok(()),
            Confirmation::Failed(reason) => Err(SubmissionError::Failed(reason)),
            Confirmation::Expired => Err(SubmissionError::Expired),
        }
    }

    async fn settle_pending(&self) -> Result<RecoveryOutcome, CheckInError> {
        let Some(pending) = PendingCheckIn::load(self.kv.as_ref())? else {
            return Ok(RecoveryOutcome::NothingPending);
        };
        let (day, mint) = (pending.day, pending.mint);

        let signature = match pending.signature {
            Some(signature) => Some(signature),
            None => self
                .ledger
                .signature_for_address(mint)
                .await
                .map_err(SubmissionError::Status)?,
        };
        let status = match signature {
            None => SignatureStatus::Unknown,
            Some(_) if pending.status == PendingStatus::Confirmed => SignatureStatus::Confirmed,
            Some(signature) => self
                .ledger
                .signature_status(signature)
                .await
                .map_err(SubmissionError::Status)?,
        };

        let signature = match (status, signature) {
            (SignatureStatus::Confirmed, Some(signature)) => signature,
            (SignatureStatus::Pending, _) => {
                info!(%day, %mint, "Pending check-in not yet confirmed");
                return Ok(RecoveryOutcome::StillPending { day, mint });
            }
            (SignatureStatus::Failed(reason), _) => return self.drop_unlanded(day, mint, reason),
            (SignatureStatus::Confirmed | SignatureStatus::Unknown, _) => {
                let height = self
                    .ledger
                    .block_height()
                    .await
                    .map_err(SubmissionError::Status)?;
                if height <= pending.last_valid_block_height {
                    info!(%day, %mint, height, "Pending check-in can still land");
                    return Ok(RecoveryOutcome::StillPending { day, mint });
                }
                return self.drop_unlanded(
                    day,
                    mint,
                    "expired before it reached the ledger".to_string(),
                );
            }
        };

        match self.commit(&pending, signature).await {
            Ok(_) => {
                info!(%day, %signature, "Recovered pending check-in");
                Ok(RecoveryOutcome::Committed { day, signature })
            }
            Err(CheckInError::Validation(ValidationError::NoHabit)) => {
                Ok(RecoveryOutcome::Discarded {
                    day,
                    mint,
                    reason: "journey no longer exists".to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }

    fn drop_unlanded(
        &self,
        day: DayNumber,
        mint: Address,
        reason: String,
    ) -> Result<RecoveryOutcome, CheckInError> {
        PendingCheckIn::clear(self.kv.as_ref())?;
        info!(%day, %mint, %reason, "Discarded pending check-in");
        Ok(RecoveryOutcome::Discarded { day, mint, reason })
    }

    /// The commit point: record the day, then drop the pending record.
    ///
    /// A record for a journey that has since been deleted or replaced is
    /// dropped and reported as [`ValidationError::NoHabit`].
    async fn commit(
        &self,
        pending: &PendingCheckIn,
        signature: TxSignature,
    ) -> Result<Progress, CheckInError> {
        let mut journey = self.journey.lock().await;
        let Some(habit) = journey.habit() else {
            self.discard_pending();
            return Err(ValidationError::NoHabit.into());
        };
        if habit.id() != pending.habit_id {
            warn!(day = %pending.day, %signature, "Pending check-in belongs to a replaced journey");
            self.discard_pending();
            return Err(ValidationError::NoHabit.into());
        }

        let recorded = habit
            .slot(pending.day)
            .proof()
            .is_some_and(|proof| proof.signature == signature);
        if !recorded {
            journey.record_check_in(
                pending.day,
                CheckInProof {
                    signature,
                    fee_paid: pending.fee,
                    mint_address: Some(pending.mint),
                },
                RecordMode::RejectCompleted,
            )?;
        }
        // The journey now holds the proof; a leftover record is recognised
        // by its signature on the next pass.
        self.discard_pending();
        Ok(journey.progress())
    }

    fn discard_pending(&self) {
        if let Err(err) = PendingCheckIn::clear(self.kv.as_ref()) {
            warn!(error = %err, "Failed to remove pending check-in");
        }
    }
}
