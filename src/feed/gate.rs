//! Dedup gate in front of the signal feed
//!
//! The gate remembers exactly one "last accepted" signal (carried in
//! [`SchedulerState`]) rather than a history, so anything at or behind it is
//! dropped.

use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::common::errors::Result;
use crate::common::traits::FeedSource;
use crate::common::types::{Signal, SignalKey};
use crate::scheduler::state::SchedulerState;

/// Fetches the latest signal and filters out ones already seen
pub struct SignalGate {
    source: Box<dyn FeedSource>,
}

impl SignalGate {
    pub fn new(source: Box<dyn FeedSource>) -> Self {
        Self { source }
    }

    /// Most recent valid signal across all symbols
    ///
    /// `Ok(None)` means the feed answered but had nothing to act on; fetch
    /// problems are `Err(RelayError::FeedUnavailable)`.
    pub async fn fetch_latest(&self) -> Result<Option<Signal>> {
        let snapshot = self.source.fetch_snapshot().await?;
        let latest = snapshot.latest_signal();
        match &latest {
            Some(signal) => debug!(key = %signal.key(), "Latest feed signal"),
            None => debug!("Feed snapshot holds no usable signal"),
        }
        Ok(latest)
    }

    /// Current prices from the feed, for mark-to-market and close-all
    pub async fn fetch_prices(&self) -> Result<HashMap<String, Decimal>> {
        Ok(self.source.fetch_snapshot().await?.latest_prices())
    }

    /// Whether `candidate` has not been accepted before
    ///
    /// Same key as the last accepted signal, or an older observation time,
    /// means stale.
    pub fn is_new(candidate: &Signal, state: &SchedulerState) -> bool {
        let key = candidate.key();
        if state.last_accepted_signal_key.as_ref() == Some(&key) {
            return false;
        }
        match state.last_accepted_at {
            Some(last) => candidate.observed_at >= last,
            None => true,
        }
    }

    /// Record `candidate` as the last accepted signal
    ///
    /// Callers persist `state` before fanning the signal out.
    pub fn commit(candidate: &Signal, state: &mut SchedulerState) -> SignalKey {
        let key = candidate.key();
        info!(key = %key, "Accepted new signal");
        state.last_accepted_signal_key = Some(key.clone());
        state.last_accepted_at = Some(candidate.observed_at);
        key
    }
}
