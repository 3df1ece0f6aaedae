//! Ledger module - envelope sealing and resilient submission to the remote ledger

pub mod auth;
pub mod envelope;
pub mod rest;
pub mod submitter;
pub mod variants;

pub use envelope::{EncryptedEnvelope, EnvelopeCodec, EnvelopeKey};
pub use rest::RestLedgerClient;
pub use submitter::{attempt_best_effort, LedgerSubmitter, RetryPolicy, Submission, SubmissionMetadata};
pub use variants::{CallVariant, EntryFunctionPayload, LedgerAccount, DEFAULT_VARIANTS};
