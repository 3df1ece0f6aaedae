//! Paper trading - subscriber accounts and the position ledger

pub mod account;
pub mod ledger;

pub use account::{Position, SubscriberAccount};
pub use ledger::{PositionLedger, SignalApplication};
