//! Common test utilities and fixtures

#![allow(dead_code)]

use serde_json::{json, Value};
use signal_relay::feed::{FeedClient, SignalGate};
use signal_relay::ledger::{EnvelopeCodec, EnvelopeKey, LedgerSubmitter, RestLedgerClient, RetryPolicy};
use signal_relay::ledger::variants::LedgerAccount;
use signal_relay::scheduler::{Backoff, DispatchSettings, LogNotifier, PollScheduler, SchedulerParts};
use signal_relay::store::{JsonStateStore, JsonSubscriberStore};
use signal_relay::SubscriberAccount;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Top-level key the feed nests its samples under
pub const SIGNALS_KEY: &str = "forecast_today_hourly";
/// Path the feed is served from on the mock server
pub const FEED_PATH: &str = "/forecast";
/// Module address used by every ledger fixture
pub const MODULE_ADDRESS: &str = "0xmodule";
pub const OPERATOR_ADDRESS: &str = "0xoperator";
pub const OPERATOR_KEY: &str = "0a0b0c0d";

/// One hourly feed sample
pub fn sample(time: &str, entry: f64, side: &str) -> Value {
    json!({
        "time": time,
        "entry_price": entry,
        "signal": side,
        "stop_loss": entry * 0.95,
        "take_profit": entry * 1.05,
    })
}

/// Full feed body from (symbol, samples) pairs
pub fn feed_body(symbols: Vec<(&str, Vec<Value>)>) -> Value {
    let section: serde_json::Map<String, Value> = symbols
        .into_iter()
        .map(|(symbol, samples)| (symbol.to_string(), Value::Array(samples)))
        .collect();
    json!({ "generated_at": "2024-05-01T00:00:00Z", SIGNALS_KEY: section })
}

/// Serve `body` as the feed until the server is reset
pub async fn mount_feed(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Accept every ledger transaction
pub async fn mount_ledger_accepting(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/transactions"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "hash": "0xhash" })))
        .mount(server)
        .await;
}

pub fn feed_client(server: &MockServer) -> FeedClient {
    FeedClient::with_timeout(
        &format!("{}{}", server.uri(), FEED_PATH),
        SIGNALS_KEY,
        Duration::from_secs(5),
    )
    .expect("Failed to create feed client")
}

/// Submitter with fast retries against `server`
pub fn submitter(server: &MockServer, max_attempts: u32) -> LedgerSubmitter {
    let transport = RestLedgerClient::with_timeout(&server.uri(), Duration::from_secs(5))
        .expect("Failed to create ledger client");
    LedgerSubmitter::new(Arc::new(transport), MODULE_ADDRESS)
        .with_retry(RetryPolicy::new(max_attempts, Duration::from_millis(1)))
}

pub fn settings(admin_id: Option<&str>) -> DispatchSettings {
    DispatchSettings {
        operator: LedgerAccount::new(OPERATOR_ADDRESS, OPERATOR_KEY),
        admin_id: admin_id.map(str::to_string),
        fallback_allocation: dec!(0.10),
        starting_balance: dec!(10000),
        default_leverage: 1,
        backoff: Backoff::new(Duration::from_secs(60), Duration::from_secs(600)),
    }
}

/// Scheduler wired to mock servers and JSON stores under `dir`
pub fn scheduler(
    feed: &MockServer,
    ledger: &MockServer,
    dir: &Path,
    admin_id: Option<&str>,
) -> PollScheduler {
    PollScheduler::new(
        SchedulerParts {
            gate: SignalGate::new(Box::new(feed_client(feed))),
            submitter: submitter(ledger, 1),
            codec: EnvelopeCodec::new(EnvelopeKey::derive(OPERATOR_KEY)),
            subscribers: Box::new(JsonSubscriberStore::new(dir.join("subscribers.json"))),
            state_store: Box::new(JsonStateStore::new(dir.join("state.json"))),
            notifier: Arc::new(LogNotifier),
        },
        settings(admin_id),
    )
    .expect("Failed to create scheduler")
}

/// Auto-trading subscriber
pub fn trader(address: &str, balance: Decimal, leverage: u32) -> SubscriberAccount {
    let mut account = SubscriberAccount::new(address, "0f0e0d0c", balance, leverage);
    account.auto_trade_enabled = true;
    account.monitoring_enabled = true;
    account
}

/// Monitoring-only subscriber
pub fn watcher(address: &str) -> SubscriberAccount {
    let mut account = SubscriberAccount::new(address, "0f0e0d0c", dec!(10000), 1);
    account.monitoring_enabled = true;
    account
}
