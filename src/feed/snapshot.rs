//! Feed snapshot and latest-signal selection

use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::messages::FeedSample;
use crate::common::types::Signal;

/// Symbol -> ordered hourly samples, as returned by one feed poll
///
/// Symbols iterate in lexical order; that order breaks ties when two
/// symbols share the most recent sample time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    samples: BTreeMap<String, Vec<FeedSample>>,
}

impl FeedSnapshot {
    pub fn new(samples: BTreeMap<String, Vec<FeedSample>>) -> Self {
        Self { samples }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.values().all(|s| s.is_empty())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.samples.keys().map(|s| s.as_str())
    }

    /// The single most recent valid signal across all symbols
    ///
    /// Only the last sample per symbol is consulted. Samples that fail
    /// validation (unknown side, non-positive entry, bad time) do not
    /// compete. Returns `None` when nothing qualifies.
    pub fn latest_signal(&self) -> Option<Signal> {
        let mut latest: Option<Signal> = None;

        for (symbol, samples) in &self.samples {
            let Some(sample) = samples.last() else {
                continue;
            };
            let candidate = match sample.to_signal(symbol) {
                Ok(signal) => signal,
                Err(e) => {
                    debug!(symbol = %symbol, "Skipping last sample: {}", e);
                    continue;
                }
            };

            let newer = latest
                .as_ref()
                .map(|current| candidate.observed_at > current.observed_at)
                .unwrap_or(true);
            if newer {
                latest = Some(candidate);
            }
        }

        latest
    }

    /// Current price per symbol: the last sample's positive entry price
    pub fn latest_prices(&self) -> HashMap<String, Decimal> {
        self.samples
            .iter()
            .filter_map(|(symbol, samples)| {
                let price = samples.last()?.entry_price?;
                (price > Decimal::ZERO).then(|| (symbol.to_uppercase(), price))
            })
            .collect()
    }
}
