//! Feed module - signal feed client, snapshot selection and dedup gate

pub mod client;
pub mod gate;
pub mod messages;
pub mod snapshot;

pub use client::FeedClient;
pub use gate::SignalGate;
pub use snapshot::FeedSnapshot;
