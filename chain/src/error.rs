use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::transaction::{EncodeError, SignError};

/// A ledger call failed before producing an answer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger unreachable: {0}")]
    Transport(String),
    #[error("ledger returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("ledger error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("unexpected ledger response: {0}")]
    InvalidResponse(String),
}

/// The commitment transaction could not be assembled. Nothing was signed or
/// sent.
#[derive(Debug, Error)]
pub enum TransactionBuildError {
    #[error("failed to fetch a recent blockhash: {0}")]
    Blockhash(#[source] LedgerError),
    #[error("failed to fetch rent-exempt minimum: {0}")]
    Rent(#[source] LedgerError),
    #[error("badge {field} is {len} bytes; the limit is {max}")]
    MetadataField {
        field: &'static str,
        len: usize,
        max: usize,
    },
    #[error("mint key could not sign: {0}")]
    MintSignature(#[from] SignError),
}

/// The transaction was built but did not reach a confirmed state.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("signer rejected the transaction: {0}")]
    SignerRejected(String),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("ledger rejected the transaction: {0}")]
    LedgerRejected(#[source] LedgerError),
    #[error("transaction failed on the ledger: {0}")]
    Failed(String),
    #[error("transaction expired before it was confirmed")]
    Expired,
    #[error("no confirmation within {0:?}")]
    TimedOut(Duration),
    #[error("confirmation status unavailable: {0}")]
    Status(#[source] LedgerError),
}

#[derive(Debug, Error)]
pub enum KeypairError {
    #[error("failed to read keypair {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("keypair {path} is not a JSON byte array: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("keypair {path} is invalid: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

impl SubmissionError {
    /// The transaction provably never reached the ledger: it was refused
    /// before sending, or the node answered the submission with an error.
    #[must_use]
    pub const fn never_sent(&self) -> bool {
        matches!(
            self,
            Self::SignerRejected(_) | Self::Encode(_) | Self::LedgerRejected(LedgerError::Rpc { .. })
        )
    }
}
