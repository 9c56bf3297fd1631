//! Error types for the onboarding bot.

/// Errors surfaced by onboarding work (store lookups and Slack sends).
///
/// Configuration, payload and signature errors are handled where they arise:
/// at startup, at deserialization and in the request middleware.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Slack error: {0}")]
    Slack(#[from] SlackError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to load template {name}: {reason}")]
    Template { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key-value store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Slack Web API errors.
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("No bot token available for {method}")]
    NotAuthenticated { method: String },

    #[error("Request to {method} failed: {reason}")]
    RequestFailed { method: String, reason: String },

    #[error("{method} returned HTTP {status}: {body}")]
    Status {
        method: String,
        status: u16,
        body: String,
    },

    #[error("{method} returned error: {error}")]
    Api { method: String, error: String },

    #[error("Invalid response from {method}: {reason}")]
    InvalidResponse { method: String, reason: String },
}

/// Malformed inbound or stored payloads.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Invalid step list: {0}")]
    StepList(String),
}

/// Slack request signature failures.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    #[error("Request timestamp is not a number: {0}")]
    InvalidTimestamp(String),

    #[error("Request timestamp outside the allowed window ({skew}s)")]
    StaleTimestamp { skew: u64 },

    #[error("Signature mismatch")]
    Mismatch,

    #[error("Signing secret rejected by HMAC")]
    InvalidSecret,
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
