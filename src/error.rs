use std::sync::Arc;

use thiserror::Error;

/// Result type used by fallible adapter constructors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while setting up rollout collaborators.
///
/// Evaluating a rollout never fails. Errors only surface when constructing adapters such as
/// `RedisStore`, before any evaluation takes place.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Store URL could not be parsed.
    #[error("invalid store url")]
    InvalidStoreUrl(#[source] url::ParseError),
    /// Store URL uses a scheme no adapter understands.
    #[error("unsupported store url scheme: {0}")]
    UnsupportedStoreScheme(String),
    /// Store client reported an error.
    // Store client errors are not clonable, so we're wrapping them in an Arc.
    #[error("store error")]
    Store(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(value: redis::RedisError) -> Self {
        Self::Store(Arc::new(value))
    }
}
