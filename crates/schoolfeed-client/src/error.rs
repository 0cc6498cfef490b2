//! Client error types.

use schoolfeed_core::DateRangeError;
use schoolfeed_server::FeedError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid command line input.
    #[error("invalid date range: {0}")]
    DateRange(#[from] DateRangeError),

    /// Building the feed failed.
    #[error("{0}")]
    Feed(#[from] FeedError),

    /// Rendering output failed.
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),
}

impl ClientError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
