//! Feed error types.

use schoolfeed_providers::{ProviderError, ProviderErrorCode};
use thiserror::Error;

use crate::cache::CacheError;

/// Result type for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;

/// Errors that can occur while building a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The school system rejected or failed a request.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The response cache failed for a reason other than a miss.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Missing or unusable configuration, e.g. no credentials.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// A cached payload could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FeedError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if the error is caused by the caller's input, such as
    /// an unknown person, rather than by the school system or the local
    /// setup.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Provider(e) if e.code() == ProviderErrorCode::NotFound)
    }

    /// Returns true for authentication problems, including missing
    /// credentials.
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::Config { .. } => true,
            Self::Provider(e) => matches!(
                e.code(),
                ProviderErrorCode::AuthenticationFailed | ProviderErrorCode::AuthorizationFailed
            ),
            _ => false,
        }
    }
}
