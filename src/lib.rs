//! SignalRelay Library
//!
//! Polls a trading-signal feed, keeps leveraged paper portfolios for
//! subscribers, and records each accepted signal on a remote ledger as an
//! encrypted envelope.

pub mod common;
pub mod config;
pub mod feed;
pub mod ledger;
pub mod paper;
pub mod scheduler;
pub mod store;

// Re-export commonly used types
pub use common::errors::{RelayError, Result};
pub use common::traits::{FeedSource, LedgerTransport, Notifier, StateStore, SubscriberStore};
pub use common::types::{Identity, Side, Signal, SignalKey, SubscriberId, TxHash};
pub use config::types::AppConfig;
pub use feed::{FeedClient, FeedSnapshot, SignalGate};
pub use ledger::{EncryptedEnvelope, EnvelopeCodec, EnvelopeKey, LedgerSubmitter, RestLedgerClient};
pub use paper::{Position, PositionLedger, SubscriberAccount};

// Scheduler types
pub use scheduler::{
    CycleOutcome, DispatchEvent, DispatchSettings, LogNotifier, PollScheduler, SchedulerParts,
    SchedulerState,
};
pub use store::{JsonStateStore, JsonSubscriberStore};
