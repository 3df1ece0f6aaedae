//! Feed wire types

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::common::errors::{RelayError, Result};
use crate::common::types::{Side, Signal};

/// One hourly sample for a symbol as served by the feed
///
/// Every field is optional on the wire and samples are decoded one by one
/// ([`FeedSample::from_value`]), so a single bad sample does not poison the
/// whole snapshot; validation happens in [`FeedSample::to_signal`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSample {
    /// ISO-8601 time of the hourly bucket
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub entry_price: Option<Decimal>,
    /// LONG or SHORT
    #[serde(default)]
    pub signal: Option<String>,
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
    #[serde(default)]
    pub take_profit: Option<Decimal>,
}

impl FeedSample {
    /// Decode one raw sample
    ///
    /// A sample with a wrongly typed field decodes as an empty sample, which
    /// never yields a signal or a price.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|e| {
            debug!("Ignoring undecodable feed sample: {}", e);
            Self::default()
        })
    }

    /// Parsed sample time, if present and well formed
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.time.as_deref().and_then(parse_sample_time)
    }

    /// Validate this sample into a signal for `symbol`
    pub fn to_signal(&self, symbol: &str) -> Result<Signal> {
        let observed_at = self.observed_at().ok_or_else(|| {
            RelayError::InvalidResponse(format!(
                "Missing or invalid sample time for {}: {:?}",
                symbol, self.time
            ))
        })?;
        let side: Side = self.signal.as_deref().unwrap_or_default().parse()?;

        Signal::new(
            symbol,
            side,
            self.entry_price.unwrap_or_default(),
            self.stop_loss.unwrap_or_default(),
            self.take_profit.unwrap_or_default(),
            observed_at,
        )
    }
}

/// Parse a feed timestamp
///
/// Accepts RFC 3339 and naive `YYYY-MM-DD[T ]HH:MM[:SS]` forms; naive times
/// are taken as UTC.
pub fn parse_sample_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_sample_time_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
        assert_eq!(parse_sample_time("2024-05-01T13:00:00Z"), Some(expected));
        assert_eq!(parse_sample_time("2024-05-01T15:00:00+02:00"), Some(expected));
        assert_eq!(parse_sample_time("2024-05-01T13:00:00"), Some(expected));
        assert_eq!(parse_sample_time("2024-05-01 13:00"), Some(expected));
        assert_eq!(parse_sample_time("yesterday"), None);
    }

    #[test]
    fn test_sample_deserializes_numbers_and_strings() {
        let json = r#"{
            "time": "2024-05-01T13:00:00",
            "entry_price": 64231.5,
            "signal": "LONG",
            "stop_loss": "63000",
            "take_profit": 66000,
            "confidence": 0.8
        }"#;
        let sample: FeedSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.entry_price, Some(dec!(64231.5)));
        assert_eq!(sample.stop_loss, Some(dec!(63000)));

        let signal = sample.to_signal("btc").unwrap();
        assert_eq!(signal.symbol, "BTC");
        assert_eq!(signal.side, Side::Long);
        assert_eq!(signal.take_profit, dec!(66000));
    }

    #[test]
    fn test_sample_without_side_is_rejected() {
        let sample = FeedSample {
            time: Some("2024-05-01T13:00:00Z".to_string()),
            entry_price: Some(dec!(100)),
            signal: Some("HOLD".to_string()),
            stop_loss: None,
            take_profit: None,
        };
        assert!(sample.to_signal("BTC").is_err());
    }

    #[test]
    fn test_sample_without_entry_is_rejected() {
        let sample = FeedSample {
            time: Some("2024-05-01T13:00:00Z".to_string()),
            entry_price: None,
            signal: Some("SHORT".to_string()),
            stop_loss: None,
            take_profit: None,
        };
        assert!(sample.to_signal("BTC").is_err());
    }
}
