//! In-process ledger for tests and offline runs.
//!
//! Accepts any well-formed signed transaction, and lets the caller script
//! how confirmation and later status queries turn out.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use checkin_types::{Address, Lamports, TxSignature};

use crate::LedgerError;
use crate::ledger::{BlockhashContext, Confirmation, LedgerClient, LedgerFut, SignatureStatus};
use crate::transaction::{Blockhash, Transaction};

/// Rent-exemption constants: bytes of per-account overhead, lamports per
/// byte-year and the two-year exemption threshold.
const ACCOUNT_OVERHEAD: u64 = 128;
const LAMPORTS_PER_BYTE_YEAR: u64 = 3_480;
const EXEMPTION_YEARS: u64 = 2;

#[must_use]
pub fn rent_exempt_minimum(space: u64) -> Lamports {
    Lamports::new((ACCOUNT_OVERHEAD + space) * LAMPORTS_PER_BYTE_YEAR * EXEMPTION_YEARS)
}

/// What `confirm_transaction` does with the next submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfirmBehavior {
    #[default]
    Confirm,
    Fail(String),
    Expire,
    /// Never resolve; for exercising timeouts and cancellation.
    Hang,
}

#[derive(Debug)]
struct State {
    balances: HashMap<Address, Lamports>,
    context: BlockhashContext,
    block_height: u64,
    confirm: ConfirmBehavior,
    blockhash_error: Option<LedgerError>,
    submit_error: Option<LedgerError>,
    submitted: Vec<Vec<u8>>,
    statuses: HashMap<TxSignature, SignatureStatus>,
    touched: HashMap<Address, TxSignature>,
}

#[derive(Debug)]
pub struct MemoryLedger {
    state: Mutex<State>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                balances: HashMap::new(),
                context: BlockhashContext {
                    blockhash: Blockhash::new_from_array([1; 32]),
                    last_valid_block_height: 150,
                    slot: 100,
                },
                block_height: 100,
                confirm: ConfirmBehavior::default(),
                blockhash_error: None,
                submit_error: None,
                submitted: Vec::new(),
                statuses: HashMap::new(),
                touched: HashMap::new(),
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_balance(&self, address: Address, balance: Lamports) {
        self.state().balances.insert(address, balance);
    }

    pub fn set_context(&self, context: BlockhashContext) {
        self.state().context = context;
    }

    pub fn set_block_height(&self, height: u64) {
        self.state().block_height = height;
    }

    pub fn set_confirm_behavior(&self, behavior: ConfirmBehavior) {
        self.state().confirm = behavior;
    }

    pub fn fail_blockhash(&self, error: Option<LedgerError>) {
        self.state().blockhash_error = error;
    }

    pub fn reject_submissions(&self, error: Option<LedgerError>) {
        self.state().submit_error = error;
    }

    pub fn set_signature_status(&self, signature: TxSignature, status: SignatureStatus) {
        self.state().statuses.insert(signature, status);
    }

    /// Wire bytes of every accepted submission, oldest first.
    #[must_use]
    pub fn submitted(&self) -> Vec<Vec<u8>> {
        self.state().submitted.clone()
    }
}

impl LedgerClient for MemoryLedger {
    fn latest_blockhash(&self) -> LedgerFut<'_, BlockhashContext> {
        let result = {
            let state = self.state();
            match &state.blockhash_error {
                Some(err) => Err(err.clone()),
                None => Ok(state.context),
            }
        };
        Box::pin(async move { result })
    }

    fn minimum_balance_for_rent_exemption(&self, space: u64) -> LedgerFut<'_, Lamports> {
        Box::pin(async move { Ok(rent_exempt_minimum(space)) })
    }

    fn balance(&self, address: Address) -> LedgerFut<'_, Lamports> {
        let balance = self
            .state()
            .balances
            .get(&address)
            .copied()
            .unwrap_or(Lamports::ZERO);
        Box::pin(async move { Ok(balance) })
    }

    fn submit_transaction<'a>(
        &'a self,
        wire: &'a [u8],
        _min_context_slot: u64,
    ) -> LedgerFut<'a, TxSignature> {
        Box::pin(async move {
            let mut state = self.state();
            if let Some(err) = &state.submit_error {
                return Err(err.clone());
            }
            let transaction = Transaction::from_wire(wire).map_err(|e| LedgerError::Rpc {
                code: -32602,
                message: e.to_string(),
            })?;
            let signature = transaction.id().ok_or_else(|| LedgerError::Rpc {
                code: -32602,
                message: "transaction is not signed".to_string(),
            })?;
            let status = match &state.confirm {
                ConfirmBehavior::Confirm => SignatureStatus::Confirmed,
                ConfirmBehavior::Fail(reason) => SignatureStatus::Failed(reason.clone()),
                ConfirmBehavior::Expire => SignatureStatus::Unknown,
                ConfirmBehavior::Hang => SignatureStatus::Pending,
            };
            state.statuses.insert(signature, status);
            for key in &transaction.message().account_keys {
                state.touched.insert(Address::from(*key), signature);
            }
            state.submitted.push(wire.to_vec());
            Ok(signature)
        })
    }

    fn confirm_transaction(
        &self,
        _signature: TxSignature,
        _context: BlockhashContext,
    ) -> LedgerFut<'_, Confirmation> {
        let behavior = self.state().confirm.clone();
        Box::pin(async move {
            match behavior {
                ConfirmBehavior::Confirm => Ok(Confirmation::Confirmed),
                ConfirmBehavior::Fail(reason) => Ok(Confirmation::Failed(reason)),
                ConfirmBehavior::Expire => Ok(Confirmation::Expired),
                ConfirmBehavior::Hang => std::future::pending().await,
            }
        })
    }

    fn signature_status(&self, signature: TxSignature) -> LedgerFut<'_, SignatureStatus> {
        let status = self
            .state()
            .statuses
            .get(&signature)
            .cloned()
            .unwrap_or(SignatureStatus::Unknown);
        Box::pin(async move { Ok(status) })
    }

    fn block_height(&self) -> LedgerFut<'_, u64> {
        let height = self.state().block_height;
        Box::pin(async move { Ok(height) })
    }

    fn signature_for_address(&self, address: Address) -> LedgerFut<'_, Option<TxSignature>> {
        let signature = self.state().touched.get(&address).copied();
        Box::pin(async move { Ok(signature) })
    }
}
