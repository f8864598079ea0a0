//! Error types for the janitor toolkit.
//!
//! Expected API-level failures (409/429/4xx/5xx) are never surfaced through
//! this type — they are reported as [`crate::outcome::RequestOutcome`]
//! variants so batch operations can degrade to partial completion. The
//! variants here cover conditions that should fail fast (bad configuration)
//! or abort an operation outright (sidecar store I/O).

use thiserror::Error;

/// Error that can occur while constructing or running janitor operations.
#[derive(Debug, Error)]
pub enum JanitorError {
    /// Configuration is invalid or incomplete.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to build the underlying HTTP client.
    #[error("http client error: {0}")]
    HttpClient(String),

    /// Reading or writing the ownership sidecar file failed.
    #[error("ownership store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl JanitorError {
    /// Create an invalid-configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        JanitorError::InvalidConfig(message.into())
    }

    /// Create a store error without an underlying cause.
    pub fn store(message: impl Into<String>) -> Self {
        JanitorError::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Create a store error wrapping an underlying cause.
    pub fn store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        JanitorError::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error indicates a configuration problem that requires
    /// operator intervention (as opposed to an I/O condition).
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            JanitorError::InvalidConfig(_) | JanitorError::HttpClient(_)
        )
    }
}

/// Result type for janitor operations.
pub type JanitorResult<T> = Result<T, JanitorError>;
