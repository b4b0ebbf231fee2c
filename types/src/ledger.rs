//! Ledger identifiers shared by the journey record and the transaction layer.
//!
//! Both render as base58, the ledger's canonical text form, and serialize as
//! strings so a persisted habit stays readable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_pubkey::Pubkey;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseLedgerIdError {
    #[error("invalid address: {0}")]
    Address(String),
    #[error("invalid base58: {0}")]
    Base58(String),
    #[error("expected {expected} bytes, decoded {actual}")]
    Length { expected: usize, actual: usize },
}

/// A 32-byte account address (an ed25519 public key or a program-derived
/// address).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(Pubkey);

impl Address {
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(Pubkey::new_from_array(bytes))
    }

    #[must_use]
    pub const fn pubkey(&self) -> &Pubkey {
        &self.0
    }

    #[must_use]
    pub fn to_bytes(self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

impl From<Pubkey> for Address {
    fn from(value: Pubkey) -> Self {
        Self(value)
    }
}

impl From<Address> for Pubkey {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl FromStr for Address {
    type Err = ParseLedgerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pubkey::from_str(s.trim())
            .map(Self)
            .map_err(|e| ParseLedgerIdError::Address(e.to_string()))
    }
}

impl TryFrom<String> for Address {
    type Error = ParseLedgerIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

/// A 64-byte transaction signature; the first signature of a transaction is
/// also its identifier on the ledger.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxSignature([u8; 64]);

impl TxSignature {
    pub const LEN: usize = 64;

    #[must_use]
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl Default for TxSignature {
    fn default() -> Self {
        Self([0; 64])
    }
}

impl FromStr for TxSignature {
    type Err = ParseLedgerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| ParseLedgerIdError::Base58(e.to_string()))?;
        <[u8; 64]>::try_from(bytes.as_slice())
            .map(Self)
            .map_err(|_| ParseLedgerIdError::Length {
                expected: Self::LEN,
                actual: bytes.len(),
            })
    }
}

impl TryFrom<String> for TxSignature {
    type Error = ParseLedgerIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TxSignature> for String {
    fn from(value: TxSignature) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxSignature({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_program_is_all_ones() {
        let addr: Address = "11111111111111111111111111111111".parse().unwrap();
        assert_eq!(addr, Address::default());
        assert_eq!(addr.to_string(), "11111111111111111111111111111111");
    }

    #[test]
    fn address_text_roundtrip() {
        let text = "9ny4NhFAkJWEwU1VSggsz1fbiwEn3o7GEXZ8NvdcDQhh";
        let addr: Address = text.parse().unwrap();
        assert_eq!(addr.to_string(), text);
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(matches!(
            "abc".parse::<Address>(),
            Err(ParseLedgerIdError::Address(_))
        ));
        // '0' is outside the base58 alphabet.
        assert!(matches!(
            "0OIl".parse::<Address>(),
            Err(ParseLedgerIdError::Address(_))
        ));
    }

    #[test]
    fn signature_rejects_wrong_length() {
        let err = "abc".parse::<TxSignature>().unwrap_err();
        assert!(matches!(err, ParseLedgerIdError::Length { expected: 64, .. }));
    }

    #[test]
    fn address_serializes_as_string() {
        let addr = Address::new([3; 32]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{addr}\""));
        assert_eq!(Pubkey::from(addr).to_bytes(), [3; 32]);
    }

    #[test]
    fn signature_serializes_as_string() {
        let sig = TxSignature::new([7; 64]);
        let json = serde_json::to_string(&sig).unwrap();
        let back: TxSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
        assert!(json.starts_with('"'));
    }
}
