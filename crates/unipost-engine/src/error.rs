//! Engine error types.

use thiserror::Error;
use unipost_media::MediaError;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(#[from] unipost_models::ValidationError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Provider error: {0}")]
    Provider(#[from] unipost_provider::ProviderError),

    #[error("Variant store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Batch-wide precondition failure: nothing was attempted and the
    /// caller gets this instead of a BatchResult.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::Validation(_)
                | EngineError::Media(
                    MediaError::NoEncoderAvailable
                        | MediaError::FfmpegNotFound
                        | MediaError::FfprobeNotFound
                        | MediaError::FileNotFound(_)
                )
        )
    }
}
