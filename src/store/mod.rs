//! Subscriber and scheduler-state stores

pub mod json;
pub mod memory;

pub use json::{JsonStateStore, JsonSubscriberStore};
pub use memory::{MemoryStateStore, MemorySubscriberStore};
