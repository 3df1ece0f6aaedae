//! Poll scheduler
//!
//! One timer-driven loop: fetch, dedup, commit, then dispatch to each
//! subscriber in turn. Dispatch is sequential so there is never more than
//! one writer to the subscriber store.

use chrono::Utc;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use super::notify::DispatchEvent;
use super::state::{Backoff, SchedulerState};
use crate::common::errors::{RelayError, Result};
use crate::common::traits::{Notifier, StateStore, SubscriberStore};
use crate::common::types::{Identity, Signal, SignalKey, SubscriberId, TxHash};
use crate::config::types::AppConfig;
use crate::feed::gate::SignalGate;
use crate::ledger::envelope::EnvelopeCodec;
use crate::ledger::submitter::{LedgerSubmitter, SubmissionMetadata};
use crate::ledger::variants::LedgerAccount;
use crate::paper::account::SubscriberAccount;
use crate::paper::ledger::PositionLedger;

/// Operator-level dispatch settings
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Account used for ledger calls made on behalf of the admin
    pub operator: LedgerAccount,
    pub admin_id: Option<String>,
    /// Allocation for subscribers that never set one
    pub fallback_allocation: Decimal,
    pub starting_balance: Decimal,
    pub default_leverage: u32,
    pub backoff: Backoff,
}

impl DispatchSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            operator: LedgerAccount::new(
                config.ledger.operator_address.clone(),
                config.ledger.operator_signing_key.clone(),
            ),
            admin_id: config.settings.admin_subscriber_id.clone(),
            fallback_allocation: config.paper.default_allocation_fraction,
            starting_balance: config.paper.starting_balance,
            default_leverage: config.paper.leverage(),
            backoff: Backoff::new(
                config.scheduler.poll_interval(),
                config.scheduler.max_backoff(),
            ),
        }
    }
}

/// Collaborators the scheduler drives
pub struct SchedulerParts {
    pub gate: SignalGate,
    pub submitter: LedgerSubmitter,
    pub codec: EnvelopeCodec,
    pub subscribers: Box<dyn SubscriberStore>,
    pub state_store: Box<dyn StateStore>,
    pub notifier: Arc<dyn Notifier>,
}

/// What one subscriber got out of a dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriberOutcome {
    pub id: SubscriberId,
    pub identity: Identity,
    /// Collateral of the paper position opened, if any
    pub opened: Option<Decimal>,
    pub tx_hash: Option<TxHash>,
    /// Everything that went wrong for this subscriber
    pub errors: Vec<String>,
}

impl SubscriberOutcome {
    fn new(id: &SubscriberId, identity: Identity) -> Self {
        Self {
            id: id.clone(),
            identity,
            opened: None,
            tx_hash: None,
            errors: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Result of fanning one signal out
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub key: SignalKey,
    pub outcomes: Vec<SubscriberOutcome>,
    /// Subscribers not opted in, or missing from the store
    pub skipped: usize,
}

/// How a cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    FeedUnavailable(String),
    NoSignal,
    Stale(SignalKey),
    Dispatched(DispatchReport),
}

/// Balance and unrealized PnL for one subscriber
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSummary {
    pub balance: Decimal,
    pub locked_collateral: Decimal,
    pub unrealized_pnl: Decimal,
    pub open_positions: usize,
}

impl PortfolioSummary {
    pub fn equity(&self) -> Decimal {
        self.balance
            .saturating_add(self.locked_collateral)
            .saturating_add(self.unrealized_pnl)
    }
}

/// Result of closing a subscriber's priced positions
#[derive(Debug, Clone, PartialEq)]
pub struct CloseAllSummary {
    pub closed: usize,
    pub realized_pnl: Decimal,
    pub balance: Decimal,
    /// Positions left open for lack of a current price
    pub remaining: usize,
}

/// Drives fetch and dispatch cycles
pub struct PollScheduler {
    gate: SignalGate,
    submitter: LedgerSubmitter,
    codec: EnvelopeCodec,
    subscribers: Box<dyn SubscriberStore>,
    state_store: Box<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    settings: DispatchSettings,
    state: SchedulerState,
}

impl PollScheduler {
    /// Build a scheduler, picking up persisted state
    pub fn new(parts: SchedulerParts, settings: DispatchSettings) -> Result<Self> {
        let state = parts.state_store.load()?;
        if let Some(key) = &state.last_accepted_signal_key {
            info!(key = %key, "Resuming after last accepted signal");
        }
        Ok(Self {
            gate: parts.gate,
            submitter: parts.submitter,
            codec: parts.codec,
            subscribers: parts.subscribers,
            state_store: parts.state_store,
            notifier: parts.notifier,
            settings,
            state,
        })
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn subscribers(&self) -> &dyn SubscriberStore {
        self.subscribers.as_ref()
    }

    /// Delay before the next cycle given the failures so far
    pub fn next_delay(&self) -> Duration {
        self.settings.backoff.delay(self.state.consecutive_failures)
    }

    /// Loop until `shutdown` resolves
    ///
    /// A running cycle always completes; shutdown is only observed while
    /// waiting for the next one.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let result = self.run_cycle().await;
            log_cycle(&result);

            let delay = self.next_delay();
            debug!(delay_ms = delay.as_millis() as u64, "Waiting for next cycle");
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// One fetch and, for a new signal, one dispatch
    ///
    /// Feed problems come back as `CycleOutcome::FeedUnavailable`. `Err` is
    /// reserved for store failures around the commit.
    #[instrument(skip(self))]
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let candidate = match self.gate.fetch_latest().await {
            Ok(candidate) => candidate,
            Err(e) => {
                self.state.record_failure();
                warn!(
                    failures = self.state.consecutive_failures,
                    "Feed unavailable: {}",
                    e
                );
                return Ok(CycleOutcome::FeedUnavailable(e.to_string()));
            }
        };

        let Some(signal) = candidate else {
            self.state.record_success();
            return Ok(CycleOutcome::NoSignal);
        };

        if !SignalGate::is_new(&signal, &self.state) {
            self.state.record_success();
            debug!(key = %signal.key(), "Signal already handled");
            return Ok(CycleOutcome::Stale(signal.key()));
        }

        // Both store calls happen before the commit so either failure leaves
        // the signal uncommitted and it is retried next cycle
        let ids = match self.subscribers.list_ids() {
            Ok(ids) => ids,
            Err(e) => {
                self.state.record_failure();
                error!(key = %signal.key(), "Could not list subscribers: {}", e);
                return Err(e);
            }
        };

        // Persist the commit before any subscriber sees the signal
        let mut next = self.state.clone();
        let key = SignalGate::commit(&signal, &mut next);
        if let Err(e) = self.state_store.save(&next) {
            self.state.record_failure();
            error!(key = %key, "Could not persist commit: {}", e);
            return Err(e);
        }
        self.state = next;

        let mut report = DispatchReport {
            key,
            outcomes: Vec::with_capacity(ids.len()),
            skipped: 0,
        };
        for id in &ids {
            match self.dispatch_to(id, &signal).await {
                Some(outcome) => {
                    if !outcome.is_clean() {
                        warn!(subscriber = %id, errors = ?outcome.errors, "Dispatch incomplete");
                    }
                    report.outcomes.push(outcome);
                }
                None => report.skipped += 1,
            }
        }

        self.state.record_success();
        Ok(CycleOutcome::Dispatched(report))
    }

    /// Apply and record `signal` for one subscriber
    ///
    /// Never fails as a whole; problems are collected in the outcome so the
    /// next subscriber still runs. `None` when the subscriber is skipped.
    async fn dispatch_to(&mut self, id: &SubscriberId, signal: &Signal) -> Option<SubscriberOutcome> {
        let identity = Identity::resolve(id, self.settings.admin_id.as_deref());
        let mut outcome = SubscriberOutcome::new(id, identity.clone());

        let mut account = match self.subscribers.load(id) {
            Ok(Some(account)) => account,
            Ok(None) => {
                warn!(subscriber = %id, "Listed subscriber has no account");
                return None;
            }
            Err(e) => {
                outcome.errors.push(format!("load: {}", e));
                return Some(outcome);
            }
        };
        if !account.is_opted_in() {
            return None;
        }
        debug!(subscriber = %id, admin = identity.is_admin(), "Dispatching signal");

        self.notify(id, DispatchEvent::SignalReceived { signal: signal.clone() }, &mut outcome)
            .await;

        if account.auto_trade_enabled {
            let application =
                PositionLedger::apply_signal(&mut account, signal, self.settings.fallback_allocation);
            if let Err(e) = self.subscribers.save(id, &account) {
                outcome.errors.push(format!("save: {}", e));
            }
            let event = match application.opened {
                Ok(collateral) => {
                    outcome.opened = Some(collateral);
                    DispatchEvent::PositionsUpdated {
                        signal: signal.clone(),
                        closed: application.closed,
                        realized_pnl: application.realized_pnl,
                        collateral,
                        balance: account.paper_balance,
                    }
                }
                Err(e) => {
                    outcome.errors.push(format!("open: {}", e));
                    DispatchEvent::OpenRejected {
                        signal: signal.clone(),
                        closed: application.closed,
                        realized_pnl: application.realized_pnl,
                        reason: e.to_string(),
                    }
                }
            };
            self.notify(id, event, &mut outcome).await;
        }

        let event = match self.record(&identity, &account, signal).await {
            Ok((tx_hash, variant)) => {
                outcome.tx_hash = Some(tx_hash.clone());
                DispatchEvent::SignalRecorded {
                    signal: signal.clone(),
                    tx_hash,
                    variant,
                }
            }
            Err(e) => {
                outcome.errors.push(format!("record: {}", e));
                DispatchEvent::RecordFailed {
                    signal: signal.clone(),
                    reason: e.to_string(),
                }
            }
        };
        self.notify(id, event, &mut outcome).await;

        Some(outcome)
    }

    /// Seal `signal` and submit it from the account `identity` acts with
    async fn record(
        &self,
        identity: &Identity,
        account: &SubscriberAccount,
        signal: &Signal,
    ) -> Result<(TxHash, &'static str)> {
        let sender = match identity {
            Identity::Admin => self.settings.operator.clone(),
            Identity::Regular(_) => {
                LedgerAccount::new(account.address.clone(), account.signing_key_material.clone())
            }
        };
        let counterparty = if account.address.is_empty() {
            self.settings.operator.address.as_str()
        } else {
            account.address.as_str()
        };

        let envelope = self.codec.encode_signal(signal)?;
        let submission = self
            .submitter
            .submit(
                &envelope,
                &SubmissionMetadata {
                    sender: &sender,
                    counterparty,
                    unix_seconds: Utc::now().timestamp(),
                },
            )
            .await?;
        Ok((submission.tx_hash, submission.variant))
    }

    async fn notify(&self, id: &SubscriberId, event: DispatchEvent, outcome: &mut SubscriberOutcome) {
        if let Err(e) = self.notifier.notify(id, &event).await {
            outcome.errors.push(format!("notify: {}", e));
        }
    }

    fn load_account(&self, id: &SubscriberId) -> Result<SubscriberAccount> {
        self.subscribers
            .load(id)?
            .ok_or_else(|| RelayError::SubscriberNotFound(id.to_string()))
    }

    /// Balance and mark-to-market PnL at current feed prices
    pub async fn portfolio(&self, id: &SubscriberId) -> Result<PortfolioSummary> {
        let account = self.load_account(id)?;
        let prices = self.gate.fetch_prices().await?;
        Ok(PortfolioSummary {
            balance: account.paper_balance,
            locked_collateral: account.locked_collateral(),
            unrealized_pnl: PositionLedger::mark_to_market(&account, |s| prices.get(s).copied()),
            open_positions: account.positions.len(),
        })
    }

    /// Close every position that has a current feed price
    pub async fn close_all(&mut self, id: &SubscriberId) -> Result<CloseAllSummary> {
        let mut account = self.load_account(id)?;
        let prices = self.gate.fetch_prices().await?;

        let before = account.positions.len();
        let realized_pnl = PositionLedger::close_all(&mut account, |s| prices.get(s).copied());
        self.subscribers.save(id, &account)?;

        let remaining = account.positions.len();
        info!(subscriber = %id, closed = before - remaining, realized_pnl = %realized_pnl, "Closed positions");
        Ok(CloseAllSummary {
            closed: before - remaining,
            realized_pnl,
            balance: account.paper_balance,
            remaining,
        })
    }

    /// Add a subscriber, or replace the credentials of an existing one
    ///
    /// New subscribers start with the configured balance and leverage and
    /// monitoring enabled.
    pub fn enroll(
        &mut self,
        id: &SubscriberId,
        address: &str,
        signing_key_material: &str,
        auto_trade: bool,
    ) -> Result<SubscriberAccount> {
        let account = match self.subscribers.load(id)? {
            Some(mut existing) => {
                existing.address = address.to_string();
                existing.signing_key_material = signing_key_material.to_string();
                existing.auto_trade_enabled = auto_trade;
                existing
            }
            None => {
                let mut account = SubscriberAccount::new(
                    address,
                    signing_key_material,
                    self.settings.starting_balance,
                    self.settings.default_leverage,
                );
                account.monitoring_enabled = true;
                account.auto_trade_enabled = auto_trade;
                account
            }
        };
        self.subscribers.save(id, &account)?;
        info!(subscriber = %id, auto_trade, "Subscriber enrolled");
        Ok(account)
    }
}

fn log_cycle(result: &Result<CycleOutcome>) {
    match result {
        Ok(CycleOutcome::FeedUnavailable(_)) => {}
        Ok(CycleOutcome::NoSignal) => debug!("No signal in feed"),
        Ok(CycleOutcome::Stale(_)) => {}
        Ok(CycleOutcome::Dispatched(report)) => info!(
            key = %report.key,
            subscribers = report.outcomes.len(),
            failed = report.outcomes.iter().filter(|o| !o.is_clean()).count(),
            skipped = report.skipped,
            "Signal dispatched"
        ),
        Err(e) => error!("Cycle failed: {}", e),
    }
}
