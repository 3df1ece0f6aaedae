//! REST transport for the ledger node

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::auth::generate_auth_headers;
use super::variants::{EntryFunctionPayload, LedgerAccount};
use crate::common::errors::{RelayError, Result};
use crate::common::traits::LedgerTransport;
use crate::common::types::TxHash;

const SUBMIT_PATH: &str = "/v1/transactions";

/// Transaction submission request body
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest<'a> {
    pub sender: &'a str,
    pub payload: &'a EntryFunctionPayload,
    /// Unix seconds at submission
    pub timestamp: i64,
}

/// Transaction submission response body
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub hash: String,
}

/// REST client for the ledger node
#[derive(Debug, Clone)]
pub struct RestLedgerClient {
    /// HTTP client
    client: Client,
    /// Node base URL
    base_url: String,
}

impl RestLedgerClient {
    /// Create a new ledger client with the default 30s timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create a new ledger client with custom timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Check if the node is reachable
    #[instrument(skip(self))]
    pub async fn check_health(&self) -> Result<bool> {
        let url = format!("{}/v1", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl LedgerTransport for RestLedgerClient {
    #[instrument(skip(self, sender, payload), fields(sender = %sender.address, function = %payload.function))]
    async fn submit(
        &self,
        sender: &LedgerAccount,
        payload: &EntryFunctionPayload,
    ) -> Result<TxHash> {
        let url = format!("{}{}", self.base_url, SUBMIT_PATH);
        let body = serde_json::to_string(&SubmitRequest {
            sender: &sender.address,
            payload,
            timestamp: chrono::Utc::now().timestamp(),
        })?;

        let headers = generate_auth_headers(
            &sender.address,
            &sender.signing_key_material,
            "POST",
            SUBMIT_PATH,
            &body,
        )?;

        debug!("Submitting transaction to: {}", url);
        let request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        let response = headers.apply_to_request(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::InvalidResponse(format!(
                "Ledger returned status {}: {}",
                status, body
            )));
        }

        let submitted: SubmitResponse = response.json().await?;
        debug!(hash = %submitted.hash, "Transaction accepted");
        Ok(TxHash(submitted.hash))
    }
}
