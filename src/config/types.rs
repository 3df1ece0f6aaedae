//! Configuration types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::errors::{RelayError, Result};

/// Lowest poll interval the scheduler accepts
pub const MIN_POLL_INTERVAL_MS: u64 = 5_000;

/// Leverage bounds for paper accounts
pub const MIN_LEVERAGE: u32 = 1;
pub const MAX_LEVERAGE: u32 = 100;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Signal feed configuration
    #[serde(default)]
    pub feed: FeedConfig,
    /// Poll loop configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Paper trading defaults
    #[serde(default)]
    pub paper: PaperConfig,
    /// Remote ledger configuration
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

impl AppConfig {
    /// Startup checks; any failure here is fatal
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.feed.url)
            .map_err(|e| RelayError::Configuration(format!("Invalid feed url: {}", e)))?;
        url::Url::parse(&self.ledger.node_url())
            .map_err(|e| RelayError::Configuration(format!("Invalid ledger node url: {}", e)))?;

        if self.ledger.operator_signing_key.trim().is_empty() {
            return Err(RelayError::Configuration(
                "ledger.operator_signing_key is required".to_string(),
            ));
        }
        if self.ledger.operator_address.trim().is_empty() {
            return Err(RelayError::Configuration(
                "ledger.operator_address is required".to_string(),
            ));
        }
        if self.ledger.module_address.trim().is_empty() {
            return Err(RelayError::Configuration(
                "ledger.module_address is required".to_string(),
            ));
        }
        if self.ledger.max_attempts == 0 {
            return Err(RelayError::Configuration(
                "ledger.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.paper.starting_balance < Decimal::ZERO {
            return Err(RelayError::Configuration(
                "paper.starting_balance must not be negative".to_string(),
            ));
        }
        let fraction = self.paper.default_allocation_fraction;
        if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
            return Err(RelayError::Configuration(format!(
                "paper.default_allocation_fraction must be in (0, 1], got {}",
                fraction
            )));
        }

        Ok(())
    }
}

/// Signal feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// URL returning the forecast JSON document
    #[serde(default = "default_feed_url")]
    pub url: String,
    /// Top-level key holding the symbol -> samples mapping
    #[serde(default = "default_signals_key")]
    pub signals_key: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            signals_key: default_signals_key(),
        }
    }
}

fn default_feed_url() -> String {
    "http://127.0.0.1:8000/forecast".to_string()
}

fn default_signals_key() -> String {
    "forecast_today_hourly".to_string()
}

/// Poll loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Base delay between cycles in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Upper bound for the failure backoff in milliseconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
    /// Where the last accepted signal key is kept
    #[serde(default = "default_state_path")]
    pub state_path: String,
}

impl SchedulerConfig {
    /// Poll interval, floored at `MIN_POLL_INTERVAL_MS`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms).max(self.poll_interval())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_backoff_ms: default_max_backoff(),
            state_path: default_state_path(),
        }
    }
}

fn default_poll_interval() -> u64 {
    60_000
}

fn default_max_backoff() -> u64 {
    600_000
}

fn default_state_path() -> String {
    "data/scheduler_state.json".to_string()
}

/// Paper trading defaults applied to new and partially configured accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    #[serde(default = "default_starting_balance")]
    pub starting_balance: Decimal,
    #[serde(default = "default_leverage")]
    pub default_leverage: u32,
    /// Share of the balance committed per signal when the subscriber has none set
    #[serde(default = "default_allocation_fraction")]
    pub default_allocation_fraction: Decimal,
    /// Where subscriber accounts are kept
    #[serde(default = "default_store_path")]
    pub store_path: String,
}

impl PaperConfig {
    /// Default leverage clamped into 1..=100
    pub fn leverage(&self) -> u32 {
        self.default_leverage.clamp(MIN_LEVERAGE, MAX_LEVERAGE)
    }
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_balance(),
            default_leverage: default_leverage(),
            default_allocation_fraction: default_allocation_fraction(),
            store_path: default_store_path(),
        }
    }
}

fn default_starting_balance() -> Decimal {
    dec!(10000)
}

fn default_leverage() -> u32 {
    1
}

fn default_allocation_fraction() -> Decimal {
    dec!(0.10)
}

fn default_store_path() -> String {
    "data/subscribers.json".to_string()
}

/// Ledger network selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerNetwork {
    #[default]
    Devnet,
    Testnet,
    Mainnet,
    Local,
}

impl LedgerNetwork {
    pub fn default_node_url(&self) -> &'static str {
        match self {
            LedgerNetwork::Devnet => "https://fullnode.devnet.aptoslabs.com",
            LedgerNetwork::Testnet => "https://fullnode.testnet.aptoslabs.com",
            LedgerNetwork::Mainnet => "https://fullnode.mainnet.aptoslabs.com",
            LedgerNetwork::Local => "http://127.0.0.1:8080",
        }
    }
}

/// Remote ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub network: LedgerNetwork,
    /// Overrides the network's default node URL
    #[serde(default)]
    pub node_url: Option<String>,
    /// Address of the module exposing the signal entry points
    #[serde(default)]
    pub module_address: String,
    /// Operator account address
    #[serde(default)]
    pub operator_address: String,
    /// Operator signing-key material (hex)
    #[serde(default)]
    pub operator_signing_key: String,
    /// Optional fixed 32-byte envelope key (64 hex chars)
    #[serde(default)]
    pub envelope_key: Option<String>,
    /// Attempts per call variant before falling through to the next one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First retry delay; doubles on every further attempt
    #[serde(default = "default_base_retry_delay")]
    pub base_retry_delay_ms: u64,
}

impl LedgerConfig {
    pub fn node_url(&self) -> String {
        self.node_url
            .clone()
            .unwrap_or_else(|| self.network.default_node_url().to_string())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            network: LedgerNetwork::default(),
            node_url: None,
            module_address: String::new(),
            operator_address: String::new(),
            operator_signing_key: String::new(),
            envelope_key: None,
            max_attempts: default_max_attempts(),
            base_retry_delay_ms: default_base_retry_delay(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_retry_delay() -> u64 {
    500
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Request timeout in seconds, applied to every HTTP client
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Subscriber id that acts with the operator's own ledger account
    #[serde(default)]
    pub admin_subscriber_id: Option<String>,
}

impl AppSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            request_timeout_seconds: default_request_timeout(),
            admin_subscriber_id: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    30
}
