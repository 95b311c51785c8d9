//! Structured batch logging utilities.
//!
//! Provides consistent, structured logging for batch processing with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};
use unipost_models::BatchId;

/// Batch logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct BatchLogger {
    batch_id: String,
    stage: String,
}

impl BatchLogger {
    /// Create a new logger for a batch stage.
    pub fn new(batch_id: &BatchId, stage: &str) -> Self {
        Self {
            batch_id: batch_id.as_str().to_string(),
            stage: stage.to_string(),
        }
    }

    /// Log the start of a batch stage.
    pub fn log_start(&self, message: &str) {
        info!(
            batch_id = %self.batch_id,
            stage = %self.stage,
            "Batch started: {}", message
        );
    }

    /// Log a progress update.
    pub fn log_progress(&self, message: &str) {
        info!(
            batch_id = %self.batch_id,
            stage = %self.stage,
            "Batch progress: {}", message
        );
    }

    /// Log a warning.
    pub fn log_warning(&self, message: &str) {
        warn!(
            batch_id = %self.batch_id,
            stage = %self.stage,
            "Batch warning: {}", message
        );
    }

    /// Log an error.
    pub fn log_error(&self, message: &str) {
        error!(
            batch_id = %self.batch_id,
            stage = %self.stage,
            "Batch error: {}", message
        );
    }

    /// Log the completion of a batch stage.
    pub fn log_completion(&self, message: &str) {
        info!(
            batch_id = %self.batch_id,
            stage = %self.stage,
            "Batch completed: {}", message
        );
    }

    /// Get the batch ID.
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Get the stage name.
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Create a tracing span for this batch stage.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "batch",
            batch_id = %self.batch_id,
            stage = %self.stage
        )
    }
}
