//! Trait definitions for the relay's external collaborators

use async_trait::async_trait;

use super::errors::Result;
use super::types::{SubscriberId, TxHash};
use crate::feed::snapshot::FeedSnapshot;
use crate::ledger::variants::{EntryFunctionPayload, LedgerAccount};
use crate::paper::account::SubscriberAccount;
use crate::scheduler::notify::DispatchEvent;
use crate::scheduler::state::SchedulerState;

/// Source of feed snapshots (the signal provider's HTTP endpoint)
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the current snapshot
    ///
    /// Network failures, non-2xx statuses and malformed bodies all surface
    /// as `RelayError::FeedUnavailable`.
    async fn fetch_snapshot(&self) -> Result<FeedSnapshot>;
}

/// Transport that gets an entry-function call onto the remote ledger
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Submit one call on behalf of `sender`
    ///
    /// Returns the transaction hash once the ledger accepts the call.
    async fn submit(&self, sender: &LedgerAccount, payload: &EntryFunctionPayload)
        -> Result<TxHash>;
}

/// Persisted per-subscriber accounts
///
/// Single writer: the scheduler owns the only handle.
pub trait SubscriberStore: Send {
    /// All subscriber ids, in a stable order
    fn list_ids(&self) -> Result<Vec<SubscriberId>>;

    /// Load one subscriber's account
    fn load(&self, id: &SubscriberId) -> Result<Option<SubscriberAccount>>;

    /// Persist one subscriber's account, independently of every other
    fn save(&mut self, id: &SubscriberId, account: &SubscriberAccount) -> Result<()>;
}

/// Persisted scheduler state (the last accepted signal key)
pub trait StateStore: Send {
    fn load(&self) -> Result<SchedulerState>;

    fn save(&mut self, state: &SchedulerState) -> Result<()>;
}

/// Outbound notifications to subscribers (the chat layer upstream)
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subscriber: &SubscriberId, event: &DispatchEvent) -> Result<()>;
}
