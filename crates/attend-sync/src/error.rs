//! Error types for the attendance sync agent.

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Main error type for the sync agent.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// IO errors (unreadable file, vanished file, permission denied)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Remote endpoint could not be reached
    #[error("Endpoint unavailable: {0}")]
    Unavailable(String),

    /// Base URL or endpoint path could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Directory traversal errors
    #[error("Walk error: {0}")]
    Walk(String),
}

impl SyncError {
    /// Create a new network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new invalid URL error
    pub fn invalid_url(msg: impl Into<String>) -> Self {
        Self::InvalidUrl(msg.into())
    }

    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new walk error
    pub fn walk(msg: impl Into<String>) -> Self {
        Self::Walk(msg.into())
    }

    /// Whether a retry could plausibly succeed.
    ///
    /// Only transport-level failures qualify; a response with any status code
    /// is an answer from the server and is never retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::Network(_) | SyncError::Timeout(_) | SyncError::Unavailable(_)
        )
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout(err.to_string())
        } else if err.is_connect() {
            SyncError::Unavailable(err.to_string())
        } else {
            SyncError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}
