//! The payer-side signer.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use checkin_types::{Address, TxSignature};
use ed25519_dalek::SigningKey;
use tracing::{info, warn};

use crate::ledger::LedgerClient;
use crate::transaction::Transaction;
use crate::{KeypairError, SubmissionError};

pub type SignerFut<'a> =
    Pin<Box<dyn Future<Output = Result<TxSignature, SubmissionError>> + Send + 'a>>;

/// Adds the payer signature and hands the transaction to the ledger.
///
/// A rejection (user declined, key unavailable) is a
/// [`SubmissionError::SignerRejected`].
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> Address;

    fn sign_and_submit(&self, transaction: Transaction, min_context_slot: u64) -> SignerFut<'_>;
}

/// Signs with a local ed25519 key and submits through a ledger client.
pub struct KeypairSigner {
    key: SigningKey,
    ledger: Arc<dyn LedgerClient>,
}

impl std::fmt::Debug for KeypairSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeypairSigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl KeypairSigner {
    #[must_use]
    pub fn new(key: SigningKey, ledger: Arc<dyn LedgerClient>) -> Self {
        Self { key, ledger }
    }

    /// Load a keypair file: a JSON array of 64 bytes, secret key followed by
    /// public key.
    pub fn from_file(path: &Path, ledger: Arc<dyn LedgerClient>) -> Result<Self, KeypairError> {
        let text = std::fs::read_to_string(path).map_err(|source| KeypairError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let bytes: Vec<u8> = serde_json::from_str(&text).map_err(|source| KeypairError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let bytes = <[u8; 64]>::try_from(bytes.as_slice()).map_err(|_| KeypairError::Invalid {
            path: path.to_path_buf(),
            reason: format!("expected 64 bytes, found {}", bytes.len()),
        })?;
        let key = SigningKey::from_keypair_bytes(&bytes).map_err(|e| KeypairError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(key, ledger))
    }
}

impl TransactionSigner for KeypairSigner {
    fn address(&self) -> Address {
        Address::new(self.key.verifying_key().to_bytes())
    }

    fn sign_and_submit(
        &self,
        mut transaction: Transaction,
        min_context_slot: u64,
    ) -> SignerFut<'_> {
        Box::pin(async move {
            transaction
                .partial_sign(&self.key)
                .map_err(|e| SubmissionError::SignerRejected(e.to_string()))?;
            if !transaction.is_fully_signed() {
                return Err(SubmissionError::SignerRejected(
                    "transaction still needs other signatures".to_string(),
                ));
            }
            let wire = transaction.to_wire()?;
            match self.ledger.submit_transaction(&wire, min_context_slot).await {
                Ok(signature) => {
                    info!(%signature, "Submitted transaction");
                    Ok(signature)
                }
                Err(err) => {
                    warn!(error = %err, "Ledger rejected transaction");
                    Err(SubmissionError::LedgerRejected(err))
                }
            }
        })
    }
}
