//! Events reported to subscribers after dispatch

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use crate::common::errors::Result;
use crate::common::traits::Notifier;
use crate::common::types::{Signal, SubscriberId, TxHash};

/// What happened for one subscriber while dispatching a signal
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    /// A new signal reached an opted-in subscriber
    SignalReceived { signal: Signal },
    /// Paper positions were settled and a new one opened
    PositionsUpdated {
        signal: Signal,
        closed: usize,
        realized_pnl: Decimal,
        collateral: Decimal,
        balance: Decimal,
    },
    /// Opposite positions (if any) were settled but nothing was opened
    OpenRejected {
        signal: Signal,
        closed: usize,
        realized_pnl: Decimal,
        reason: String,
    },
    /// The envelope is on the ledger
    SignalRecorded {
        signal: Signal,
        tx_hash: TxHash,
        variant: &'static str,
    },
    /// Every call variant was rejected
    RecordFailed { signal: Signal, reason: String },
}

/// Notifier that only writes to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subscriber: &SubscriberId, event: &DispatchEvent) -> Result<()> {
        match event {
            DispatchEvent::SignalReceived { signal } => info!(
                subscriber = %subscriber,
                symbol = %signal.symbol,
                side = %signal.side,
                entry = %signal.entry_price,
                "Signal received"
            ),
            DispatchEvent::PositionsUpdated {
                signal,
                closed,
                realized_pnl,
                collateral,
                balance,
            } => info!(
                subscriber = %subscriber,
                symbol = %signal.symbol,
                closed,
                realized_pnl = %realized_pnl,
                collateral = %collateral,
                balance = %balance,
                "Paper position opened"
            ),
            DispatchEvent::OpenRejected {
                signal,
                closed,
                realized_pnl,
                reason,
            } => info!(
                subscriber = %subscriber,
                symbol = %signal.symbol,
                closed,
                realized_pnl = %realized_pnl,
                "Paper position not opened: {}",
                reason
            ),
            DispatchEvent::SignalRecorded {
                signal,
                tx_hash,
                variant,
            } => info!(
                subscriber = %subscriber,
                symbol = %signal.symbol,
                tx_hash = %tx_hash,
                variant,
                "Signal recorded on ledger"
            ),
            DispatchEvent::RecordFailed { signal, reason } => info!(
                subscriber = %subscriber,
                symbol = %signal.symbol,
                "Signal not recorded: {}",
                reason
            ),
        }
        Ok(())
    }
}
