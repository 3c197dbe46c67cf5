//! Common error types and handling for Sidechat

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Sidechat client core
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Partial failure: {0}")]
    PartialFailure(String),

    #[error("Subscription error: {0}")]
    Subscription(String),
}

impl Error {
    /// Get the error code for structured logging
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Unexpected(_) => "UNEXPECTED_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Persistence(_) => "PERSISTENCE_ERROR",
            Error::PartialFailure(_) => "PARTIAL_FAILURE",
            Error::Subscription(_) => "SUBSCRIPTION_ERROR",
        }
    }

    /// Whether the session can continue in a degraded mode after this
    /// error (stale data possible) instead of treating it as fatal.
    pub fn is_degraded_mode(&self) -> bool {
        matches!(self, Error::Subscription(_))
    }
}
