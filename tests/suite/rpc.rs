//! Check-ins against a mock JSON-RPC ledger.

use std::sync::Arc;

use checkin_chain::{LedgerError, SubmissionError};
use checkin_engine::{CheckInError, OrchestratorOptions};
use checkin_types::{DayNumber, HabitCategory, Lamports, TxSignature};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{
    date, habit_file, morning, mount_happy_ledger, mount_rpc, open_journey, orchestrator,
    rpc_client,
};

async fn requests_for(server: &MockServer, rpc_method: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter_map(|request| serde_json::from_slice::<Value>(&request.body).ok())
        .filter(|body| body["method"] == rpc_method)
        .collect()
}

#[tokio::test]
async fn check_in_over_json_rpc() {
    let server = MockServer::start().await;
    let signature = TxSignature::new([8; 64]);
    mount_happy_ledger(&server, &signature.to_string()).await;

    let dir = tempfile::tempdir().unwrap();
    let start = date(2024, 1, 1);
    let mut journey = open_journey(dir.path());
    journey
        .create("Read", HabitCategory::Study, start, morning(start))
        .unwrap();
    let orchestrator = orchestrator(
        journey,
        Arc::new(rpc_client(&server)),
        OrchestratorOptions::default(),
    );

    let receipt = orchestrator.check_in(start, morning(start)).await.unwrap();
    assert_eq!(receipt.day, DayNumber::FIRST);
    assert_eq!(receipt.signature, signature);

    let sends = requests_for(&server, "sendTransaction").await;
    assert_eq!(sends.len(), 1);
    let params = &sends[0]["params"];
    assert_eq!(params[1]["encoding"], "base64");
    assert_eq!(params[1]["minContextSlot"], 500);
    assert!(params[0].as_str().is_some_and(|tx| !tx.is_empty()));

    let rent = requests_for(&server, "getMinimumBalanceForRentExemption").await;
    assert_eq!(rent[0]["params"], json!([82]));

    let reopened = open_journey(dir.path());
    let slot = reopened.habit().unwrap().slot(DayNumber::FIRST);
    assert_eq!(slot.proof().unwrap().signature, signature);
}

#[tokio::test]
async fn rejected_submission_changes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "sendTransaction" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32002, "message": "Transaction simulation failed" }
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_happy_ledger(&server, &TxSignature::new([8; 64]).to_string()).await;

    let dir = tempfile::tempdir().unwrap();
    let start = date(2024, 1, 1);
    let mut journey = open_journey(dir.path());
    journey
        .create("Read", HabitCategory::Study, start, morning(start))
        .unwrap();
    let before = habit_file(dir.path());
    let orchestrator = orchestrator(
        journey,
        Arc::new(rpc_client(&server)),
        OrchestratorOptions::default(),
    );

    let err = orchestrator.check_in(start, morning(start)).await.unwrap_err();
    match err {
        CheckInError::Submission(SubmissionError::LedgerRejected(LedgerError::Rpc {
            code, ..
        })) => assert_eq!(code, -32002),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(habit_file(dir.path()), before);
    assert!(orchestrator.pending().unwrap().is_none());
    assert!(requests_for(&server, "getSignatureStatuses").await.is_empty());
}

#[tokio::test]
async fn low_balance_stops_before_any_transaction() {
    let server = MockServer::start().await;
    mount_rpc(
        &server,
        "getBalance",
        json!({ "context": { "slot": 1 }, "value": 15_000_000u64 }),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let start = date(2024, 1, 1);
    let mut journey = open_journey(dir.path());
    journey
        .create("Read", HabitCategory::Study, start, morning(start))
        .unwrap();
    let orchestrator = orchestrator(
        journey,
        Arc::new(rpc_client(&server)),
        OrchestratorOptions::default(),
    );

    let err = orchestrator.check_in(start, morning(start)).await.unwrap_err();
    assert!(matches!(
        err,
        CheckInError::InsufficientBalance { balance, .. } if balance == Lamports::new(15_000_000)
    ));
    assert!(requests_for(&server, "getLatestBlockhash").await.is_empty());
}
