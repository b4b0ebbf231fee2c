//! Shared test utilities and fixtures
//!
//! Wires the real journey service, commitment builder and keypair signer
//! around either the in-process ledger or a mock JSON-RPC server.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use checkin_chain::{
    BadgeSettings, Blockhash, Commitment, CommitmentBuilder, KeypairSigner, LedgerClient,
    MemoryLedger, RpcLedgerClient,
};
use checkin_core::{FileKeyValueStore, Journey, JourneyStore};
use checkin_engine::{Orchestrator, OrchestratorOptions};
use checkin_types::{Address, FeeSchedule, LAMPORTS_PER_SOL, Lamports};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use ed25519_dalek::SigningKey;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TREASURY: &str = "9ny4NhFAkJWEwU1VSggsz1fbiwEn3o7GEXZ8NvdcDQhh";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Nine in the morning UTC on `day`.
pub fn morning(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_hms_opt(9, 0, 0).unwrap())
}

pub fn treasury() -> Address {
    TREASURY.parse().unwrap()
}

pub fn payer_key() -> SigningKey {
    SigningKey::from_bytes(&[42; 32])
}

pub fn payer() -> Address {
    Address::new(payer_key().verifying_key().to_bytes())
}

pub fn open_journey(dir: &Path) -> Journey {
    let kv = FileKeyValueStore::open(dir).unwrap();
    Journey::open(JourneyStore::new(Arc::new(kv))).unwrap()
}

pub fn orchestrator(
    journey: Journey,
    ledger: Arc<dyn LedgerClient>,
    options: OrchestratorOptions,
) -> Orchestrator {
    let builder = CommitmentBuilder::new(
        Arc::clone(&ledger),
        FeeSchedule::default(),
        treasury(),
        BadgeSettings::default(),
    );
    let signer = Arc::new(KeypairSigner::new(payer_key(), Arc::clone(&ledger)));
    Orchestrator::new(journey, builder, signer, ledger, options)
}

/// An in-process ledger where the payer holds 1 SOL.
pub fn funded_ledger() -> Arc<MemoryLedger> {
    let ledger = Arc::new(MemoryLedger::new());
    ledger.set_balance(payer(), Lamports::new(LAMPORTS_PER_SOL));
    ledger
}

/// Raw bytes of the stored habit file.
pub fn habit_file(dir: &Path) -> Vec<u8> {
    std::fs::read(dir.join("daily-checkin-habit.json")).unwrap()
}

pub fn rpc_client(server: &MockServer) -> RpcLedgerClient {
    RpcLedgerClient::new(server.uri(), Commitment::Confirmed, Duration::from_millis(5)).unwrap()
}

/// Answer every `rpc_method` call with `result`.
pub async fn mount_rpc(server: &MockServer, rpc_method: &str, result: Value) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result })),
        )
        .mount(server)
        .await;
}

/// A ledger that accepts a submission and reports it confirmed.
pub async fn mount_happy_ledger(server: &MockServer, signature: &str) {
    let blockhash = Blockhash::new_from_array([9; 32]).to_string();
    mount_rpc(
        server,
        "getLatestBlockhash",
        json!({
            "context": { "slot": 500 },
            "value": {
                "blockhash": blockhash,
                "lastValidBlockHeight": 650
            }
        }),
    )
    .await;
    mount_rpc(server, "getMinimumBalanceForRentExemption", json!(1_461_600)).await;
    mount_rpc(
        server,
        "getBalance",
        json!({ "context": { "slot": 500 }, "value": 2_000_000_000u64 }),
    )
    .await;
    mount_rpc(server, "sendTransaction", json!(signature)).await;
    mount_rpc(
        server,
        "getSignatureStatuses",
        json!({
            "context": { "slot": 502 },
            "value": [{ "slot": 501, "confirmations": 1, "err": null, "confirmationStatus": "confirmed" }]
        }),
    )
    .await;
    mount_rpc(server, "getBlockHeight", json!(600)).await;
}
