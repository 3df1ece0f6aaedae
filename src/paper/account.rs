//! Subscriber accounts and paper positions

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::common::errors::{RelayError, Result};
use crate::common::types::Side;
use crate::config::types::{MAX_LEVERAGE, MIN_LEVERAGE};

/// A simulated leveraged position
///
/// Owned by exactly one subscriber account. Never edited in place: it is
/// created on open and removed on close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    #[serde(with = "rust_decimal::serde::float")]
    pub entry_price: Decimal,
    /// Leverage captured at open time
    #[serde(deserialize_with = "clamped_leverage")]
    pub leverage: u32,
    /// Balance locked against this position
    #[serde(with = "rust_decimal::serde::float")]
    pub collateral: Decimal,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// `collateral × leverage`
    pub fn notional(&self) -> Decimal {
        self.collateral * Decimal::from(self.leverage)
    }

    /// Linear PnL if closed at `price`
    ///
    /// `None` when either price is not positive or the result does not fit
    /// in a `Decimal`; callers treat both as "no price available".
    pub fn pnl_at(&self, price: Decimal) -> Option<Decimal> {
        if self.entry_price <= Decimal::ZERO || price <= Decimal::ZERO {
            return None;
        }
        let price_change = price
            .checked_sub(self.entry_price)?
            .checked_div(self.entry_price)?;
        self.collateral
            .checked_mul(Decimal::from(self.leverage))?
            .checked_mul(price_change)?
            .checked_mul(self.side.direction())
    }
}

/// Persisted per-subscriber record
///
/// Decimals are stored as JSON numbers; strings are still accepted on load.
/// Out-of-range leverage and negative balances are pulled back into range
/// when read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberAccount {
    /// Ledger account address
    pub address: String,
    /// Signing-key material for the subscriber's ledger account (hex)
    pub signing_key_material: String,
    /// Paper positions follow signals
    #[serde(default)]
    pub auto_trade_enabled: bool,
    /// Signals are recorded and reported without trading
    #[serde(default)]
    pub monitoring_enabled: bool,
    #[serde(deserialize_with = "clamped_leverage")]
    pub leverage: u32,
    /// Never negative
    #[serde(
        serialize_with = "rust_decimal::serde::float::serialize",
        deserialize_with = "non_negative_balance"
    )]
    pub paper_balance: Decimal,
    #[serde(default)]
    pub positions: Vec<Position>,
    /// Share of the balance committed per signal, in (0, 1]
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub allocation_fraction: Option<Decimal>,
}

fn clamped_leverage<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(u32::deserialize(deserializer)?.clamp(MIN_LEVERAGE, MAX_LEVERAGE))
}

fn non_negative_balance<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(rust_decimal::serde::float::deserialize(deserializer)?.max(Decimal::ZERO))
}

impl SubscriberAccount {
    pub fn new(
        address: impl Into<String>,
        signing_key_material: impl Into<String>,
        starting_balance: Decimal,
        leverage: u32,
    ) -> Self {
        Self {
            address: address.into(),
            signing_key_material: signing_key_material.into(),
            auto_trade_enabled: false,
            monitoring_enabled: false,
            leverage: leverage.clamp(MIN_LEVERAGE, MAX_LEVERAGE),
            paper_balance: starting_balance.max(Decimal::ZERO),
            positions: Vec::new(),
            allocation_fraction: None,
        }
    }

    /// Change leverage for future opens; open positions keep theirs
    pub fn set_leverage(&mut self, leverage: u32) {
        self.leverage = leverage.clamp(MIN_LEVERAGE, MAX_LEVERAGE);
    }

    pub fn set_allocation(&mut self, fraction: Option<Decimal>) -> Result<()> {
        if let Some(f) = fraction {
            if f <= Decimal::ZERO || f > Decimal::ONE {
                return Err(RelayError::Configuration(format!(
                    "Allocation fraction must be in (0, 1], got {}",
                    f
                )));
            }
        }
        self.allocation_fraction = fraction;
        Ok(())
    }

    /// Allocation fraction, or `fallback` when unset
    pub fn allocation_or(&self, fallback: Decimal) -> Decimal {
        self.allocation_fraction.unwrap_or(fallback)
    }

    /// Receives signals at all
    pub fn is_opted_in(&self) -> bool {
        self.auto_trade_enabled || self.monitoring_enabled
    }

    /// Collateral currently locked in open positions
    pub fn locked_collateral(&self) -> Decimal {
        self.positions.iter().map(|p| p.collateral).sum()
    }

    pub fn positions_for<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = &'a Position> {
        self.positions.iter().filter(move |p| p.symbol == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(side: Side, entry: Decimal, collateral: Decimal, leverage: u32) -> Position {
        Position {
            symbol: "BTC".to_string(),
            side,
            entry_price: entry,
            leverage,
            collateral,
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn test_pnl_sign() {
        let long = position(Side::Long, dec!(100), dec!(1000), 2);
        let short = position(Side::Short, dec!(100), dec!(1000), 2);

        assert_eq!(long.notional(), dec!(2000));
        assert_eq!(long.pnl_at(dec!(110)), Some(dec!(200)));
        assert_eq!(short.pnl_at(dec!(110)), Some(dec!(-200)));
        assert_eq!(short.pnl_at(dec!(90)), Some(dec!(200)));
    }

    #[test]
    fn test_pnl_without_price() {
        let broken = position(Side::Long, dec!(0), dec!(1000), 2);
        assert_eq!(broken.pnl_at(dec!(110)), None);

        let long = position(Side::Long, dec!(100), dec!(1000), 2);
        assert_eq!(long.pnl_at(dec!(0)), None);
    }

    #[test]
    fn test_pnl_overflow_is_no_price() {
        let dust = position(Side::Long, dec!(0.00000000000000000001), dec!(1000), 100);
        assert_eq!(dust.pnl_at(dec!(100000000000)), None);
        // Tiny entry that still fits gives a value, not a panic
        let small = position(Side::Short, dec!(0.0001), dec!(1), 1);
        assert_eq!(small.pnl_at(dec!(0.0002)), Some(dec!(-1)));
    }

    #[test]
    fn test_new_account_clamps_inputs() {
        let account = SubscriberAccount::new("0x1", "0xkey", dec!(-5), 250);
        assert_eq!(account.paper_balance, dec!(0));
        assert_eq!(account.leverage, 100);
        assert!(!account.is_opted_in());
    }

    #[test]
    fn test_loaded_account_is_pulled_into_range() {
        let raw = serde_json::json!({
            "address": "0x1",
            "signingKeyMaterial": "0x01",
            "leverage": 250,
            "paperBalance": -12.5,
            "positions": [{
                "symbol": "BTC",
                "side": "LONG",
                "entryPrice": 100,
                "leverage": 0,
                "collateral": 50.25,
                "openedAt": "2024-05-01T12:00:00Z"
            }]
        });
        let account: SubscriberAccount = serde_json::from_value(raw).unwrap();
        assert_eq!(account.leverage, 100);
        assert_eq!(account.paper_balance, dec!(0));
        assert_eq!(account.positions[0].leverage, 1);
        assert_eq!(account.positions[0].collateral, dec!(50.25));
        assert!(account.allocation_fraction.is_none());

        let written = serde_json::to_value(&account).unwrap();
        assert!(written["paperBalance"].is_number());
        assert!(written["positions"][0]["entryPrice"].is_number());
        assert!(written["allocationFraction"].is_null());
    }

    #[test]
    fn test_set_allocation_bounds() {
        let mut account = SubscriberAccount::new("0x1", "0xkey", dec!(100), 1);
        assert!(account.set_allocation(Some(dec!(0.25))).is_ok());
        assert_eq!(account.allocation_or(dec!(0.1)), dec!(0.25));
        assert!(account.set_allocation(Some(dec!(0))).is_err());
        assert!(account.set_allocation(Some(dec!(1.01))).is_err());
        assert!(account.set_allocation(None).is_ok());
        assert_eq!(account.allocation_or(dec!(0.1)), dec!(0.1));
    }
}
