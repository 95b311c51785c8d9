//! Error types for the publishing provider client.

use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors from the publishing provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Publishing API token is not configured")]
    MissingToken,

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Provider rejected the post: {0}")]
    Rejected(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    /// Check if the error is worth retrying with backoff.
    ///
    /// Timeouts, connection failures, rate limiting and server-side errors
    /// are transient. Rejections and client-side errors are terminal for
    /// the job.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout(_) => true,
            ProviderError::Network(e) => e.is_timeout() || e.is_connect(),
            ProviderError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
