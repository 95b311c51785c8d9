//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while probing or encoding.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("no usable H.264 encoder backend")]
    NoEncoderAvailable,

    #[error("encode process failed: {message}")]
    EncodeProcessFailed {
        message: String,
        stderr_tail: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("encoded output failed validation: {0}")]
    OutputValidationFailed(String),

    #[error("FFprobe command failed: {message}")]
    ProbeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("spec violates configured bounds: {0}")]
    SpecOutOfBounds(#[from] unipost_models::ValidationError),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),
}

impl MediaError {
    /// Create an encode process failure.
    pub fn encode_failed(
        message: impl Into<String>,
        stderr_tail: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::EncodeProcessFailed {
            message: message.into(),
            stderr_tail,
            exit_code,
        }
    }

    /// Create an output validation failure.
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::OutputValidationFailed(message.into())
    }

    /// Failures worth one retry on the software backend.
    pub fn is_process_failure(&self) -> bool {
        matches!(
            self,
            MediaError::EncodeProcessFailed { .. } | MediaError::Timeout(_)
        )
    }

    /// Failures worth one redraw of the transform spec.
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, MediaError::OutputValidationFailed(_))
    }
}
