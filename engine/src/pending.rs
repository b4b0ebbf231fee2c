//! Durable record of a check-in whose transaction may have left the process.
//!
//! Written before the transaction is handed to the signer and deleted at the
//! commit point. A record that survives a crash or a dropped future is picked
//! up by [`crate::Orchestrator::recover`]. Until the signer returns, the badge
//! mint is the only handle on the transaction.

use checkin_core::{KeyValueStore, PersistenceError, delete_key, read_json, write_json};
use checkin_types::{Address, DayNumber, HabitId, Lamports, TxSignature};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PENDING_KEY: &str = "daily-checkin-pending";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingStatus {
    /// Handed to the signer; the signature is not known yet.
    Submitting,
    Submitted,
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCheckIn {
    pub habit_id: HabitId,
    pub day: DayNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<TxSignature>,
    pub mint: Address,
    pub fee: Lamports,
    /// Past this block height the transaction can no longer land.
    #[serde(default)]
    pub last_valid_block_height: u64,
    pub status: PendingStatus,
    pub started_at: DateTime<Utc>,
}

impl PendingCheckIn {
    pub fn load(kv: &dyn KeyValueStore) -> Result<Option<Self>, PersistenceError> {
        read_json(kv, PENDING_KEY)
    }

    pub fn save(&self, kv: &dyn KeyValueStore) -> Result<(), PersistenceError> {
        write_json(kv, PENDING_KEY, self)
    }

    pub fn clear(kv: &dyn KeyValueStore) -> Result<(), PersistenceError> {
        delete_key(kv, PENDING_KEY)
    }
}
