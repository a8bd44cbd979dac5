//! Error types for the store adapter, decision engine, and catalog.

use thiserror::Error;

/// Errors from the bucket store adapter and the decision engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection or command failure surfaced by the Redis client,
    /// including script compilation errors from the store.
    #[error("store command failed: {0}")]
    Redis(#[from] redis::RedisError),

    /// A script name that was never registered with the adapter.
    #[error("script '{0}' is not registered")]
    UnknownScript(String),

    /// A script reply that does not match the expected shape.
    #[error("unexpected script reply: {0}")]
    BadReply(String),
}

/// Errors raised while loading or validating the rule catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The rules file could not be read.
    #[error("failed to read rules file: {0}")]
    Io(#[from] std::io::Error),

    /// The rules document is not valid YAML or does not match the
    /// catalog schema (including unknown rule names).
    #[error("failed to parse rules document: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document parsed but violates a catalog invariant.
    #[error("invalid rule catalog: {0}")]
    Invalid(String),
}
