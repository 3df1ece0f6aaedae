//! HTTP client for the signal feed

use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};

use super::messages::FeedSample;
use super::snapshot::FeedSnapshot;
use crate::common::errors::{RelayError, Result};
use crate::common::traits::FeedSource;
use crate::config::types::FeedConfig;

/// HTTP client for the forecast feed
#[derive(Debug, Clone)]
pub struct FeedClient {
    /// HTTP client
    client: Client,
    /// Feed URL
    url: String,
    /// Top-level key holding the symbol -> samples mapping
    signals_key: String,
}

impl FeedClient {
    /// Create a new feed client with the default 30s timeout
    pub fn new(url: &str, signals_key: &str) -> Result<Self> {
        Self::with_timeout(url, signals_key, Duration::from_secs(30))
    }

    /// Create a new feed client with custom timeout
    pub fn with_timeout(url: &str, signals_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            url: url.to_string(),
            signals_key: signals_key.to_string(),
        })
    }

    pub fn from_config(config: &FeedConfig, timeout: Duration) -> Result<Self> {
        Self::with_timeout(&config.url, &config.signals_key, timeout)
    }

    /// Decode a feed body into a snapshot
    ///
    /// The signals key must be present; a `null` value is an empty snapshot.
    pub fn parse_snapshot(body: &str, signals_key: &str) -> Result<FeedSnapshot> {
        let mut document: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| RelayError::FeedUnavailable(format!("Malformed feed JSON: {}", e)))?;

        let section = document
            .get_mut(signals_key)
            .map(serde_json::Value::take)
            .ok_or_else(|| {
                RelayError::FeedUnavailable(format!("Feed body has no '{}' key", signals_key))
            })?;

        if section.is_null() {
            return Ok(FeedSnapshot::default());
        }

        // Shape is checked here; each sample is decoded on its own
        let raw: BTreeMap<String, Vec<serde_json::Value>> = serde_json::from_value(section)
            .map_err(|e| {
                RelayError::FeedUnavailable(format!("Malformed '{}' section: {}", signals_key, e))
            })?;

        let samples = raw
            .into_iter()
            .map(|(symbol, values)| {
                let decoded = values.into_iter().map(FeedSample::from_value).collect();
                (symbol, decoded)
            })
            .collect();

        Ok(FeedSnapshot::new(samples))
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_snapshot(&self) -> Result<FeedSnapshot> {
        debug!("Fetching feed snapshot");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| RelayError::FeedUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::FeedUnavailable(format!(
                "Feed returned status {}: {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RelayError::FeedUnavailable(e.to_string()))?;

        let snapshot = Self::parse_snapshot(&body, &self.signals_key)?;
        debug!(symbols = snapshot.symbols().count(), "Feed snapshot decoded");
        Ok(snapshot)
    }
}
