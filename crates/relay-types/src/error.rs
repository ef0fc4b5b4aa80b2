use std::time::Duration;

use thiserror::Error;

/// Errors from message store operations (used by the `MessageStore` trait in relay-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

/// Connection-scoped transport failures. Always terminal for that connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("malformed frame: {0}")]
    Decode(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("connection closed")]
    Closed,

    #[error("outbound queue full")]
    SlowConsumer,
}

/// Errors raised by the hub.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("delivery path closed")]
    Closed,
}

/// Startup configuration errors. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("missing required configuration parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
