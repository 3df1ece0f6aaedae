//! Integration tests for the ledger transport and submitter
//!
//! The ledger node is a local wiremock server.

mod common;

use chrono::{TimeZone, Utc};
use common::{submitter, MODULE_ADDRESS};
use rust_decimal_macros::dec;
use serde_json::json;
use signal_relay::common::traits::LedgerTransport;
use signal_relay::ledger::variants::LedgerAccount;
use signal_relay::ledger::{EntryFunctionPayload, EnvelopeCodec, EnvelopeKey, RestLedgerClient, SubmissionMetadata};
use signal_relay::{RelayError, Side, Signal, TxHash};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn account() -> LedgerAccount {
    LedgerAccount::new("0xfeed", "c0ffee")
}

fn sealed_signal() -> signal_relay::EncryptedEnvelope {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
    let signal = Signal::new("BTC", Side::Long, dec!(100), dec!(95), dec!(110), at).unwrap();
    EnvelopeCodec::new(EnvelopeKey::derive("c0ffee"))
        .encode_signal(&signal)
        .unwrap()
}

fn function(name: &str) -> String {
    format!("{}::signal_vault::{}", MODULE_ADDRESS, name)
}

// ============================================================================
// REST Transport Tests
// ============================================================================

#[tokio::test]
async fn test_submit_signs_and_returns_hash() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/transactions"))
        .and(header_exists("X-Ledger-Sender"))
        .and(header_exists("X-Ledger-Signature"))
        .and(header_exists("X-Ledger-Timestamp"))
        .and(body_partial_json(json!({
            "sender": "0xfeed",
            "payload": {
                "type": "entry_function_payload",
                "function": function("register_agent"),
            }
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "hash": "0xabc123" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = RestLedgerClient::with_timeout(&server.uri(), Duration::from_secs(5)).unwrap();
    let hash = client
        .submit(&account(), &EntryFunctionPayload::register_agent(MODULE_ADDRESS))
        .await
        .unwrap();

    assert_eq!(hash, TxHash("0xabc123".to_string()));
}

#[tokio::test]
async fn test_rejected_submit_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/transactions"))
        .respond_with(ResponseTemplate::new(400).set_body_string("MODULE_NOT_FOUND"))
        .mount(&server)
        .await;

    let client = RestLedgerClient::with_timeout(&server.uri(), Duration::from_secs(5)).unwrap();
    let result = client
        .submit(&account(), &EntryFunctionPayload::register_agent(MODULE_ADDRESS))
        .await;

    match result {
        Err(RelayError::InvalidResponse(reason)) => {
            assert!(reason.contains("400"));
            assert!(reason.contains("MODULE_NOT_FOUND"));
        }
        other => panic!("Expected InvalidResponse, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bad_signing_key_fails_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "hash": "0x1" })))
        .expect(0)
        .mount(&server)
        .await;

    let client = RestLedgerClient::with_timeout(&server.uri(), Duration::from_secs(5)).unwrap();
    let result = client
        .submit(
            &LedgerAccount::new("0xfeed", "not-hex"),
            &EntryFunctionPayload::register_agent(MODULE_ADDRESS),
        )
        .await;

    assert!(matches!(result, Err(RelayError::Configuration(_))));
}

// ============================================================================
// Submitter Tests
// ============================================================================

#[tokio::test]
async fn test_full_envelope_variant_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "payload": { "function": function("store_encrypted_signal") } })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "hash": "0xfull" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let envelope = sealed_signal();
    let account = account();
    let submission = submitter(&server, 3)
        .submit(
            &envelope,
            &SubmissionMetadata {
                sender: &account,
                counterparty: "0xfeed",
                unix_seconds: 1_714_568_400,
            },
        )
        .await
        .unwrap();

    assert_eq!(submission.tx_hash, TxHash("0xfull".to_string()));
    assert_eq!(submission.variant, "full_envelope");
    assert_eq!(submission.attempts, 1);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests.last().unwrap().body).unwrap();
    let arguments = body["payload"]["arguments"].as_array().unwrap();
    assert_eq!(arguments.len(), 8);
    assert_eq!(arguments[0], json!("0xfeed"));
    // Storage key and event id are the same digest
    assert_eq!(arguments[1], arguments[2]);
    assert_eq!(arguments[1], json!(envelope.content_hash_hex()));
    assert_eq!(arguments[7], json!("1714568400"));
}

#[tokio::test]
async fn test_falls_back_to_reduced_variant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "payload": { "function": function("store_signal") } })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "hash": "0xshort" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "payload": { "function": function("store_encrypted_signal") } })))
        .respond_with(ResponseTemplate::new(400).set_body_string("NUMBER_OF_ARGUMENTS_MISMATCH"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let account = account();
    let submission = submitter(&server, 2)
        .submit(
            &sealed_signal(),
            &SubmissionMetadata {
                sender: &account,
                counterparty: "0xfeed",
                unix_seconds: 1,
            },
        )
        .await
        .unwrap();

    assert_eq!(submission.variant, "ciphertext_only");
    assert_eq!(submission.tx_hash, TxHash("0xshort".to_string()));
}

#[tokio::test]
async fn test_all_variants_rejected() {
    let server = MockServer::start().await;
    // 1 registration + 3 variants x 2 attempts
    Mock::given(method("POST"))
        .and(path("/v1/transactions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("node overloaded"))
        .expect(7)
        .mount(&server)
        .await;

    let account = account();
    let result = submitter(&server, 2)
        .submit(
            &sealed_signal(),
            &SubmissionMetadata {
                sender: &account,
                counterparty: "0xfeed",
                unix_seconds: 1,
            },
        )
        .await;

    match result {
        Err(RelayError::SubmissionFailed(reason)) => assert_eq!(reason, "all variants failed"),
        other => panic!("Expected SubmissionFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_check_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "chain_id": 4 })))
        .mount(&server)
        .await;

    let client = RestLedgerClient::with_timeout(&server.uri(), Duration::from_secs(5)).unwrap();
    assert!(client.check_health().await.unwrap());

    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    assert!(!client.check_health().await.unwrap());
}
