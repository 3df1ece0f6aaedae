//! Scheduler state threaded through every poll cycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::types::SignalKey;

/// State carried from one cycle to the next
///
/// Only the last accepted signal is persisted; the failure counter lives for
/// the lifetime of the process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerState {
    #[serde(default)]
    pub last_accepted_signal_key: Option<SignalKey>,
    /// Observation time of the last accepted signal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accepted_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub consecutive_failures: u32,
}

impl SchedulerState {
    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }
}

/// Capped exponential backoff for the delay before the next cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
        }
    }

    /// `base` with no failures, then `base × 2^failures` up to `max`
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return self.base;
        }
        let factor = 1u32 << consecutive_failures.min(16);
        self.base.saturating_mul(factor).min(self.max)
    }
}
