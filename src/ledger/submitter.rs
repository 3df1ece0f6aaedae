//! Resilient envelope submission
//!
//! For each call variant in priority order, the submission is attempted up
//! to `max_attempts` times with exponential backoff before falling through
//! to the next variant. The first accepted call wins.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::envelope::EncryptedEnvelope;
use super::variants::{
    CallVariant, EntryFunctionPayload, EnvelopeCall, LedgerAccount, DEFAULT_VARIANTS,
};
use crate::common::errors::{RelayError, Result};
use crate::common::traits::LedgerTransport;
use crate::common::types::TxHash;
use crate::config::types::LedgerConfig;

/// Bounded retry with doubling delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay after failed attempt `attempt` (1-based): base, 2×base, 4×base…
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// Who a submission is made for
#[derive(Debug, Clone, Copy)]
pub struct SubmissionMetadata<'a> {
    /// Account that signs and pays for the call
    pub sender: &'a LedgerAccount,
    /// Account the signal is recorded against
    pub counterparty: &'a str,
    pub unix_seconds: i64,
}

/// An accepted submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub tx_hash: TxHash,
    /// Name of the variant the ledger accepted
    pub variant: &'static str,
    /// Attempts spent on the accepted variant
    pub attempts: u32,
}

/// Run a precondition whose failure is deliberately ignored
///
/// Returns `None` when the operation failed.
pub async fn attempt_best_effort<T, F>(operation: &str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T>>,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(operation, "Best-effort step failed, continuing: {}", e);
            None
        }
    }
}

/// Submits envelopes to the remote ledger
pub struct LedgerSubmitter {
    transport: Arc<dyn LedgerTransport>,
    module_address: String,
    variants: Vec<CallVariant>,
    retry: RetryPolicy,
}

impl LedgerSubmitter {
    pub fn new(transport: Arc<dyn LedgerTransport>, module_address: impl Into<String>) -> Self {
        Self {
            transport,
            module_address: module_address.into(),
            variants: DEFAULT_VARIANTS.to_vec(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(transport: Arc<dyn LedgerTransport>, config: &LedgerConfig) -> Self {
        Self::new(transport, config.module_address.clone()).with_retry(RetryPolicy::new(
            config.max_attempts,
            Duration::from_millis(config.base_retry_delay_ms),
        ))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the variant list (tried in the given order)
    pub fn with_variants(mut self, variants: Vec<CallVariant>) -> Self {
        self.variants = variants;
        self
    }

    pub fn variants(&self) -> &[CallVariant] {
        &self.variants
    }

    /// Record `envelope` on the ledger
    ///
    /// Fails with `SubmissionFailed` only after every variant has used up
    /// its attempts.
    pub async fn submit(
        &self,
        envelope: &EncryptedEnvelope,
        metadata: &SubmissionMetadata<'_>,
    ) -> Result<Submission> {
        let register = EntryFunctionPayload::register_agent(&self.module_address);
        attempt_best_effort(
            "register_agent",
            self.transport.submit(metadata.sender, &register),
        )
        .await;

        let call = EnvelopeCall {
            counterparty: metadata.counterparty,
            envelope,
            unix_seconds: metadata.unix_seconds,
        };

        for variant in &self.variants {
            let payload = variant.payload(&self.module_address, &call);
            match self.submit_with_retry(metadata.sender, &payload).await {
                Ok((tx_hash, attempts)) => {
                    info!(
                        variant = variant.name,
                        tx_hash = %tx_hash,
                        content_hash = %envelope.content_hash_hex(),
                        "Envelope recorded on ledger"
                    );
                    return Ok(Submission {
                        tx_hash,
                        variant: variant.name,
                        attempts,
                    });
                }
                Err(e) => {
                    warn!(variant = variant.name, "Variant rejected, trying next: {}", e);
                }
            }
        }

        Err(RelayError::SubmissionFailed("all variants failed".to_string()))
    }

    async fn submit_with_retry(
        &self,
        sender: &LedgerAccount,
        payload: &EntryFunctionPayload,
    ) -> Result<(TxHash, u32)> {
        let mut attempt = 1;
        loop {
            match self.transport.submit(sender, payload).await {
                Ok(hash) => return Ok((hash, attempt)),
                Err(e) if attempt >= self.retry.max_attempts => return Err(e),
                Err(e) => {
                    let delay = self.retry.delay_after(attempt);
                    debug!(
                        function = %payload.function,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Submission attempt failed: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
