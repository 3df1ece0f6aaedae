//! SignalRelay - Main Entry Point
//!
//! Polls the signal feed, applies accepted signals to subscribers' paper
//! portfolios and records them on the remote ledger.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use signal_relay::config::load_config;
use signal_relay::feed::{FeedClient, SignalGate};
use signal_relay::ledger::{EnvelopeCodec, EnvelopeKey, LedgerSubmitter, RestLedgerClient};
use signal_relay::scheduler::{
    CycleOutcome, DispatchSettings, LogNotifier, PollScheduler, SchedulerParts,
};
use signal_relay::store::{JsonStateStore, JsonSubscriberStore};
use signal_relay::{AppConfig, SubscriberId};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the feed until Ctrl-C (default)
    Run,
    /// Run a single fetch and dispatch cycle
    Once,
    /// Show a subscriber's balance and unrealized PnL
    Status { id: String },
    /// Close every priced position for a subscriber
    CloseAll { id: String },
    /// Add a subscriber with the configured starting balance
    Enroll {
        id: String,
        #[arg(long)]
        address: String,
        #[arg(long, env = "RELAY_ENROLL_SIGNING_KEY")]
        signing_key: String,
        /// Follow signals with paper positions
        #[arg(long)]
        auto_trade: bool,
    },
}

fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if args.json_logs {
        builder.json().init();
    } else {
        builder.with_thread_ids(true).init();
    }
    Ok(())
}

async fn build_scheduler(config: &AppConfig) -> Result<PollScheduler> {
    let timeout = config.settings.request_timeout();

    let feed = FeedClient::from_config(&config.feed, timeout)?;
    let transport = RestLedgerClient::with_timeout(&config.ledger.node_url(), timeout)?;
    // Submissions retry on their own; an unhealthy node only warrants a warning
    match transport.check_health().await {
        Ok(true) => info!("Ledger node is reachable"),
        Ok(false) => warn!("Ledger node reported unhealthy, submissions may fail"),
        Err(e) => warn!("Ledger node health check failed: {}", e),
    }
    let submitter = LedgerSubmitter::from_config(Arc::new(transport), &config.ledger);
    let key = EnvelopeKey::resolve(
        config.ledger.envelope_key.as_deref(),
        &config.ledger.operator_signing_key,
    )?;

    let subscribers = JsonSubscriberStore::new(&config.paper.store_path);
    info!(store = %subscribers.path().display(), "Using subscriber store");

    let scheduler = PollScheduler::new(
        SchedulerParts {
            gate: SignalGate::new(Box::new(feed)),
            submitter,
            codec: EnvelopeCodec::new(key),
            subscribers: Box::new(subscribers),
            state_store: Box::new(JsonStateStore::new(&config.scheduler.state_path)),
            notifier: Arc::new(LogNotifier),
        },
        DispatchSettings::from_config(config),
    )?;
    Ok(scheduler)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    init_logging(&args)?;

    info!("Starting SignalRelay");
    info!("Configuration file: {}", args.config);

    let config = load_config(Some(&args.config)).context("Failed to load configuration")?;
    info!(
        feed = %config.feed.url,
        node = %config.ledger.node_url(),
        network = ?config.ledger.network,
        "Configuration loaded"
    );

    let mut scheduler = build_scheduler(&config).await?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            scheduler
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for shutdown signal: {}", e);
                    }
                })
                .await;
            info!("Received shutdown signal, cleaning up...");
        }
        Command::Once => match scheduler.run_cycle().await? {
            CycleOutcome::FeedUnavailable(reason) => println!("feed unavailable: {}", reason),
            CycleOutcome::NoSignal => println!("no signal"),
            CycleOutcome::Stale(key) => println!("stale: {}", key),
            CycleOutcome::Dispatched(report) => {
                println!("dispatched {} ({} skipped)", report.key, report.skipped);
                for outcome in &report.outcomes {
                    let tx = outcome
                        .tx_hash
                        .as_ref()
                        .map(|h| h.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!("  {} tx={} errors={:?}", outcome.id, tx, outcome.errors);
                }
            }
        },
        Command::Status { id } => {
            let summary = scheduler.portfolio(&SubscriberId::new(id)).await?;
            println!("balance:     {}", summary.balance);
            println!("locked:      {}", summary.locked_collateral);
            println!("unrealized:  {}", summary.unrealized_pnl);
            println!("equity:      {}", summary.equity());
            println!("positions:   {}", summary.open_positions);
        }
        Command::CloseAll { id } => {
            let summary = scheduler.close_all(&SubscriberId::new(id)).await?;
            println!(
                "closed {} (realized {}), balance {}, {} left open",
                summary.closed, summary.realized_pnl, summary.balance, summary.remaining
            );
        }
        Command::Enroll {
            id,
            address,
            signing_key,
            auto_trade,
        } => {
            let account =
                scheduler.enroll(&SubscriberId::new(id), &address, &signing_key, auto_trade)?;
            println!(
                "enrolled {} with balance {} at {}x",
                account.address, account.paper_balance, account.leverage
            );
        }
    }

    Ok(())
}
