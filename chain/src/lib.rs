//! The on-chain half of a check-in.
//!
//! - **`builder`**: the commitment transaction (badge mint + fee transfer)
//! - **`address`**, **`instruction`**, **`transaction`**: the pieces it is
//!   made of, down to wire bytes
//! - **`ledger`**, **`rpc`**, **`memory`**: the ledger collaborator and two
//!   implementations
//! - **`signer`**: the payer-side signer
//! - **`badge`**: badge naming and off-chain metadata

pub mod address;
pub mod badge;
mod builder;
mod error;
pub mod instruction;
pub mod ledger;
pub mod memory;
pub mod rpc;
pub mod signer;
pub mod transaction;

pub use badge::{BadgeMetadata, BadgeSettings, MintedBadge};
pub use builder::{CommitmentBuilder, CommitmentTransaction};
pub use error::{KeypairError, LedgerError, SubmissionError, TransactionBuildError};
pub use ledger::{
    BlockhashContext, Commitment, Confirmation, LedgerClient, LedgerFut, SignatureStatus,
};
pub use memory::{ConfirmBehavior, MemoryLedger};
pub use rpc::RpcLedgerClient;
pub use signer::{KeypairSigner, SignerFut, TransactionSigner};
pub use transaction::{Blockhash, EncodeError, SignError, Transaction};
