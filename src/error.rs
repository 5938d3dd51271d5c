//! Error taxonomy for the watch core.
//!
//! Per-item failures (one author's tick, one post in a batch, one pipeline
//! run) are isolated by the callers and never abort an enclosing loop; only
//! construction-time configuration errors are fatal.

use thiserror::Error;

/// Errors produced by the watch core and its collaborator boundaries.
#[derive(Debug, Error)]
pub enum WatchError {
    /// A username could not be resolved to an author. The current tick is
    /// skipped; the poller retries on its next interval.
    #[error("author not found: {0}")]
    AuthorNotFound(String),

    /// Network or API failure while talking to the feed source.
    #[error("feed request failed: {0}")]
    FetchError(String),

    /// Classification or generation call failed. Aborts the current
    /// pipeline run with no reply sent.
    #[error("generation failed: {0}")]
    GenerationFailure(String),

    /// A reply was generated but could not be submitted. The triggering
    /// post stays unmarked so a future delivery may retry.
    #[error("publish failed: {0}")]
    PublishFailure(String),

    /// Memory store operation failed.
    #[error("memory store error: {0}")]
    MemoryError(String),

    /// Watermark, snapshot, or transcript persistence failed. Non-fatal:
    /// in-memory state still advances.
    #[error("cache i/o failed: {0}")]
    CacheError(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for WatchError {
    fn from(err: config::ConfigError) -> Self {
        WatchError::ConfigError(err.to_string())
    }
}
