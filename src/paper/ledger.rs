//! Position ledger
//!
//! Pure operations over one subscriber's [`SubscriberAccount`]. No I/O; the
//! caller loads and persists the account around these calls.
//!
//! # Rules
//!
//! - Opening debits the (2-decimal, truncated) collateral from the balance.
//! - An opposite-side signal closes every position on that symbol with the
//!   other side; same-side positions stay open alongside the new one.
//! - Closing credits `collateral + pnl`, floored at zero.
//! - PnL is linear: `collateral × leverage × (exit − entry) / entry × ±1`.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use super::account::{Position, SubscriberAccount};
use crate::common::errors::{RelayError, Result};
use crate::common::types::{Side, Signal};

/// Outcome of running one signal through an account
#[derive(Debug)]
pub struct SignalApplication {
    /// Number of opposite-side positions closed
    pub closed: usize,
    /// Realized PnL over those closes
    pub realized_pnl: Decimal,
    /// Collateral of the newly opened position, or why nothing was opened
    pub opened: Result<Decimal>,
}

/// Paper position arithmetic
pub struct PositionLedger;

impl PositionLedger {
    /// Truncate to 2 decimals (toward zero, not banker's rounding)
    pub fn truncate_cents(amount: Decimal) -> Decimal {
        (amount * dec!(100)).floor() / dec!(100)
    }

    /// Open a position for `signal`
    ///
    /// Uses `min(requested, balance)` truncated to cents. Fails with
    /// `InsufficientBalance` when that is not positive.
    pub fn open_position(
        account: &mut SubscriberAccount,
        signal: &Signal,
        requested_collateral: Decimal,
    ) -> Result<Decimal> {
        let used = Self::truncate_cents(requested_collateral.min(account.paper_balance));
        if used <= Decimal::ZERO {
            return Err(RelayError::InsufficientBalance {
                requested: requested_collateral,
                available: account.paper_balance,
            });
        }

        account.paper_balance -= used;
        account.positions.push(Position {
            symbol: signal.symbol.clone(),
            side: signal.side,
            entry_price: signal.entry_price,
            leverage: account.leverage,
            collateral: used,
            opened_at: Utc::now(),
        });

        debug!(
            symbol = %signal.symbol,
            side = %signal.side,
            collateral = %used,
            balance = %account.paper_balance,
            "Opened paper position"
        );
        Ok(used)
    }

    /// Close every position on `symbol` whose side differs from `new_side`
    ///
    /// Returns the total realized PnL. Positions without a usable price stay
    /// open.
    pub fn close_opposite_positions(
        account: &mut SubscriberAccount,
        symbol: &str,
        new_side: Side,
        close_price: Decimal,
    ) -> Decimal {
        Self::close_where(account, |p| {
            (p.symbol == symbol && p.side == new_side.opposite()).then_some(close_price)
        })
        .1
    }

    /// Close every position whose symbol has a current price
    pub fn close_all<F>(account: &mut SubscriberAccount, price_lookup: F) -> Decimal
    where
        F: Fn(&str) -> Option<Decimal>,
    {
        Self::close_where(account, |p| price_lookup(&p.symbol)).1
    }

    /// Unrealized PnL over all open positions; unpriced ones contribute 0
    pub fn mark_to_market<F>(account: &SubscriberAccount, price_lookup: F) -> Decimal
    where
        F: Fn(&str) -> Option<Decimal>,
    {
        account
            .positions
            .iter()
            .filter_map(|p| p.pnl_at(price_lookup(&p.symbol)?))
            .fold(Decimal::ZERO, |total, pnl| total.saturating_add(pnl))
    }

    /// Close opposite positions at the signal's entry, then open alongside
    ///
    /// Requested collateral is `balance × allocation` measured after the
    /// closes settle.
    pub fn apply_signal(
        account: &mut SubscriberAccount,
        signal: &Signal,
        fallback_allocation: Decimal,
    ) -> SignalApplication {
        let (closed, realized_pnl) = Self::close_where(account, |p| {
            (p.symbol == signal.symbol && p.side != signal.side).then_some(signal.entry_price)
        });

        let requested = account.paper_balance * account.allocation_or(fallback_allocation);
        let opened = Self::open_position(account, signal, requested);

        SignalApplication {
            closed,
            realized_pnl,
            opened,
        }
    }

    /// Close positions for which `close_price` yields a price
    ///
    /// Returns (closed count, realized PnL).
    fn close_where<F>(account: &mut SubscriberAccount, close_price: F) -> (usize, Decimal)
    where
        F: Fn(&Position) -> Option<Decimal>,
    {
        let mut realized = Decimal::ZERO;
        let mut closed = 0;
        let mut kept = Vec::with_capacity(account.positions.len());

        for position in std::mem::take(&mut account.positions) {
            let pnl = close_price(&position).and_then(|price| position.pnl_at(price));
            let settled = pnl.and_then(|pnl| {
                let balance = account
                    .paper_balance
                    .checked_add(position.collateral)?
                    .checked_add(pnl)?;
                Some((pnl, balance, realized.checked_add(pnl)?))
            });
            match settled {
                Some((pnl, balance, total)) => {
                    account.paper_balance = balance.max(Decimal::ZERO);
                    realized = total;
                    closed += 1;
                    debug!(
                        symbol = %position.symbol,
                        side = %position.side,
                        pnl = %pnl,
                        balance = %account.paper_balance,
                        "Closed paper position"
                    );
                }
                None => kept.push(position),
            }
        }

        account.positions = kept;
        (closed, realized)
    }
}
