//! Error types for the relay

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias using our RelayError
pub type Result<T> = std::result::Result<T, RelayError>;

/// Main error type for relay operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// Feed could not be fetched or decoded; retried on the next cycle
    #[error("Feed unavailable: {0}")]
    FeedUnavailable(String),

    /// Not enough paper balance to open a position
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    /// Every call variant was rejected by the remote ledger
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Store read/write errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    /// Envelope encryption errors
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Subscriber not present in the store
    #[error("Subscriber not found: {0}")]
    SubscriberNotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}
