//! Signing and wire encoding for legacy ledger transactions.
//!
//! Message compilation and the wire layout are the ledger SDK's; this module
//! adds per-signer partial signing with an ed25519 key, so the mint key and
//! the payer can sign at different times.

use checkin_types::{Address, TxSignature};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use solana_instruction::Instruction;
use solana_message::Message;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use thiserror::Error;

/// Recent blockhash that bounds a transaction's validity window.
pub use solana_hash::Hash as Blockhash;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignError {
    #[error("{0} is not a required signer of this message")]
    NotASigner(Address),
}

#[derive(Debug, Error)]
#[error("transaction encoding failed: {0}")]
pub struct EncodeError(#[from] bincode::Error);

fn to_tx_signature(signature: &Signature) -> TxSignature {
    let mut bytes = [0; TxSignature::LEN];
    bytes.copy_from_slice(signature.as_ref());
    TxSignature::new(bytes)
}

/// Compile `instructions` into a legacy message with `payer` as the first
/// (fee-paying) signer.
#[must_use]
pub fn compile(payer: &Address, instructions: &[Instruction], blockhash: Blockhash) -> Message {
    Message::new_with_blockhash(instructions, Some(payer.pubkey()), &blockhash)
}

/// A compiled message plus one signature slot per required signer.
///
/// Empty slots hold the all-zero signature until filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    inner: solana_transaction::Transaction,
    message_bytes: Vec<u8>,
}

impl Transaction {
    #[must_use]
    pub fn new_unsigned(message: Message) -> Self {
        let message_bytes = message.serialize();
        Self {
            inner: solana_transaction::Transaction::new_unsigned(message),
            message_bytes,
        }
    }

    /// Decode wire bytes produced by [`Self::to_wire`].
    pub fn from_wire(wire: &[u8]) -> Result<Self, EncodeError> {
        let inner: solana_transaction::Transaction = bincode::deserialize(wire)?;
        let message_bytes = inner.message.serialize();
        Ok(Self {
            inner,
            message_bytes,
        })
    }

    #[must_use]
    pub fn message(&self) -> &Message {
        &self.inner.message
    }

    /// Serialized message: the bytes every signer signs.
    #[must_use]
    pub fn message_bytes(&self) -> &[u8] {
        &self.message_bytes
    }

    /// Keys whose signatures the transaction requires, in signature order.
    #[must_use]
    pub fn signer_keys(&self) -> &[Pubkey] {
        let message = self.message();
        &message.account_keys[..usize::from(message.header.num_required_signatures)]
    }

    /// Fill the slot belonging to `key`'s public address.
    pub fn partial_sign(&mut self, key: &SigningKey) -> Result<TxSignature, SignError> {
        let pubkey = Pubkey::new_from_array(key.verifying_key().to_bytes());
        let slot = self
            .signer_keys()
            .iter()
            .position(|k| *k == pubkey)
            .ok_or(SignError::NotASigner(Address::from(pubkey)))?;
        let bytes = key.sign(&self.message_bytes).to_bytes();
        self.inner.signatures[slot] = Signature::from(bytes);
        Ok(TxSignature::new(bytes))
    }

    /// The signature `address` contributed, if its slot is filled.
    #[must_use]
    pub fn signature_of(&self, address: &Address) -> Option<TxSignature> {
        self.signer_keys()
            .iter()
            .position(|k| k == address.pubkey())
            .map(|i| &self.inner.signatures[i])
            .filter(|sig| **sig != Signature::default())
            .map(to_tx_signature)
    }

    /// The first signature, which the ledger uses as the transaction id.
    #[must_use]
    pub fn id(&self) -> Option<TxSignature> {
        self.inner
            .signatures
            .first()
            .filter(|sig| **sig != Signature::default())
            .map(to_tx_signature)
    }

    #[must_use]
    pub fn is_fully_signed(&self) -> bool {
        self.inner
            .signatures
            .iter()
            .all(|sig| *sig != Signature::default())
    }

    /// Check every filled slot against its signer's public key.
    #[must_use]
    pub fn verify_filled_signatures(&self) -> bool {
        self.signer_keys()
            .iter()
            .zip(&self.inner.signatures)
            .filter(|(_, sig)| **sig != Signature::default())
            .all(|(key, sig)| {
                let signature = ed25519_dalek::Signature::from_bytes(to_tx_signature(sig).as_bytes());
                VerifyingKey::from_bytes(&key.to_bytes())
                    .is_ok_and(|vk| vk.verify(&self.message_bytes, &signature).is_ok())
            })
    }

    /// Wire bytes for submission.
    pub fn to_wire(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(bincode::serialize(&self.inner)?)
    }
}
