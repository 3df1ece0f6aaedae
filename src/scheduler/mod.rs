//! Scheduler - poll loop, dispatch and notifications

pub mod notify;
pub mod poller;
pub mod state;

pub use notify::{DispatchEvent, LogNotifier};
pub use poller::{
    CloseAllSummary, CycleOutcome, DispatchReport, DispatchSettings, PollScheduler,
    PortfolioSummary, SchedulerParts, SubscriberOutcome,
};
pub use state::{Backoff, SchedulerState};
