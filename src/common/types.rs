//! Domain types shared across the feed, paper ledger and remote ledger

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::errors::{RelayError, Result};

/// Direction of a signal or position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short
    pub fn direction(&self) -> Decimal {
        match self {
            Side::Long => Decimal::ONE,
            Side::Short => Decimal::NEGATIVE_ONE,
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

impl FromStr for Side {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "LONG" => Ok(Side::Long),
            "SHORT" => Ok(Side::Short),
            other => Err(RelayError::InvalidResponse(format!(
                "Unknown signal side: {}",
                other
            ))),
        }
    }
}

/// A directional trade recommendation for one symbol
///
/// Immutable once accepted by the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Uppercased symbol, e.g. BTC
    pub symbol: String,
    pub side: Side,
    /// Always strictly positive
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    /// Time of the feed sample this signal was read from
    pub observed_at: DateTime<Utc>,
}

impl Signal {
    /// Build a validated signal
    ///
    /// Rejects non-positive entry prices and negative stop/target levels so
    /// that nothing downstream ever divides by a zero entry.
    pub fn new(
        symbol: &str,
        side: Side,
        entry_price: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
        observed_at: DateTime<Utc>,
    ) -> Result<Self> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(RelayError::InvalidResponse("Empty signal symbol".to_string()));
        }
        if entry_price <= Decimal::ZERO {
            return Err(RelayError::InvalidResponse(format!(
                "Non-positive entry price for {}: {}",
                symbol, entry_price
            )));
        }
        if stop_loss < Decimal::ZERO || take_profit < Decimal::ZERO {
            return Err(RelayError::InvalidResponse(format!(
                "Negative stop/target level for {}",
                symbol
            )));
        }

        Ok(Self {
            symbol,
            side,
            entry_price,
            stop_loss,
            take_profit,
            observed_at,
        })
    }

    /// Identity of the event this signal describes
    pub fn key(&self) -> SignalKey {
        SignalKey::from_signal(self)
    }
}

/// Dedup key: `(symbol, observed_at, side, entry_price)` rendered as a string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalKey(String);

impl SignalKey {
    pub fn from_signal(signal: &Signal) -> Self {
        Self(format!(
            "{}|{}|{}|{}",
            signal.symbol,
            signal.observed_at.to_rfc3339(),
            signal.side,
            signal.entry_price.normalize()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<String> for SignalKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for SignalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a subscriber in the store (the chat id upstream)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who a dispatch is acting for, resolved once per subscriber session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// The operator; ledger calls are made with the operator's own account
    Admin,
    /// Any other subscriber; ledger calls use the subscriber's account
    Regular(SubscriberId),
}

impl Identity {
    pub fn resolve(id: &SubscriberId, admin_id: Option<&str>) -> Self {
        match admin_id {
            Some(admin) if admin == id.as_str() => Identity::Admin,
            _ => Identity::Regular(id.clone()),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Identity::Admin)
    }
}

/// Hash of an accepted ledger transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("long".parse::<Side>().unwrap(), Side::Long);
        assert_eq!(" SHORT ".parse::<Side>().unwrap(), Side::Short);
        assert!("NEUTRAL".parse::<Side>().is_err());
    }

    #[test]
    fn test_side_direction() {
        assert_eq!(Side::Long.direction(), dec!(1));
        assert_eq!(Side::Short.direction(), dec!(-1));
        assert_eq!(Side::Long.opposite(), Side::Short);
    }

    #[test]
    fn test_signal_symbol_is_uppercased() {
        let signal =
            Signal::new("btc", Side::Long, dec!(100), dec!(95), dec!(110), sample_time()).unwrap();
        assert_eq!(signal.symbol, "BTC");
    }

    #[test]
    fn test_signal_rejects_non_positive_entry() {
        assert!(Signal::new("BTC", Side::Long, dec!(0), dec!(0), dec!(0), sample_time()).is_err());
        assert!(
            Signal::new("BTC", Side::Long, dec!(-1), dec!(0), dec!(0), sample_time()).is_err()
        );
    }

    #[test]
    fn test_signal_key_ignores_stop_and_target() {
        let a =
            Signal::new("BTC", Side::Long, dec!(100), dec!(95), dec!(110), sample_time()).unwrap();
        let b =
            Signal::new("BTC", Side::Long, dec!(100.0), dec!(90), dec!(120), sample_time()).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().as_str(), "BTC|2024-05-01T13:00:00+00:00|LONG|100");
    }

    #[test]
    fn test_identity_resolution() {
        let admin = SubscriberId::new("42");
        let other = SubscriberId::new("7");
        assert_eq!(Identity::resolve(&admin, Some("42")), Identity::Admin);
        assert_eq!(
            Identity::resolve(&other, Some("42")),
            Identity::Regular(other.clone())
        );
        assert!(!Identity::resolve(&admin, None).is_admin());
    }
}
