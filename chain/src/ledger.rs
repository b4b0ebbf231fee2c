//! The ledger collaborator.
//!
//! [`LedgerClient`] is dyn-compatible so the orchestrator can hold an
//! `Arc<dyn LedgerClient>`; methods return boxed futures.

use std::future::Future;
use std::pin::Pin;

use checkin_types::{Address, Lamports, TxSignature};
use serde::{Deserialize, Serialize};

use crate::LedgerError;
use crate::transaction::Blockhash;

pub type LedgerFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, LedgerError>> + Send + 'a>>;

/// Commitment level a read or confirmation waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }

    /// Whether a status reported at `reached` satisfies `self`.
    #[must_use]
    pub fn is_met_by(self, reached: Self) -> bool {
        reached.rank() >= self.rank()
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Processed => 0,
            Self::Confirmed => 1,
            Self::Finalized => 2,
        }
    }
}

/// Snapshot of a recent blockhash and where the ledger was when it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockhashContext {
    pub blockhash: Blockhash,
    /// The transaction expires once the block height passes this.
    pub last_valid_block_height: u64,
    /// Slot the blockhash was observed at; used as the minimum context slot
    /// when submitting.
    pub slot: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Failed(String),
    Expired,
}

/// Point-in-time status of a submitted signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    /// The ledger has no record of it.
    Unknown,
    /// Seen but below the requested commitment.
    Pending,
    Confirmed,
    Failed(String),
}

pub trait LedgerClient: Send + Sync {
    fn latest_blockhash(&self) -> LedgerFut<'_, BlockhashContext>;

    fn minimum_balance_for_rent_exemption(&self, space: u64) -> LedgerFut<'_, Lamports>;

    fn balance(&self, address: Address) -> LedgerFut<'_, Lamports>;

    /// Submit signed wire bytes; returns the transaction's first signature.
    fn submit_transaction<'a>(
        &'a self,
        wire: &'a [u8],
        min_context_slot: u64,
    ) -> LedgerFut<'a, TxSignature>;

    /// Wait until `signature` reaches the client's commitment, fails, or its
    /// blockhash expires.
    fn confirm_transaction(
        &self,
        signature: TxSignature,
        context: BlockhashContext,
    ) -> LedgerFut<'_, Confirmation>;

    fn signature_status(&self, signature: TxSignature) -> LedgerFut<'_, SignatureStatus>;

    /// Current block height at the client's commitment.
    fn block_height(&self) -> LedgerFut<'_, u64>;

    /// Most recent transaction that touched `address`, if the ledger has one.
    fn signature_for_address(&self, address: Address) -> LedgerFut<'_, Option<TxSignature>>;
}
