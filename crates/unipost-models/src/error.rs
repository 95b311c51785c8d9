//! Validation errors raised at batch entry.

use thiserror::Error;

/// Errors produced while validating a batch request or transform bounds.
///
/// These are surfaced immediately and abort the batch before any work
/// is performed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("no publish targets selected")]
    EmptyTargets,

    #[error("source path is empty")]
    EmptySourcePath,

    #[error("account id is empty")]
    EmptyAccountId,

    #[error("duplicate publish target: {0}")]
    DuplicateTarget(String),

    #[error("scheduled time is not in the future: {0}")]
    ScheduledAtInPast(String),

    #[error("unparseable scheduled time: {0}")]
    InvalidScheduledAt(String),

    #[error("{knob} = {value} outside [{min}, {max}]")]
    OutOfBounds {
        knob: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid bounds for {knob}: min {min} > max {max}")]
    InvalidBounds {
        knob: &'static str,
        min: f64,
        max: f64,
    },
}

pub type ValidationResult<T> = Result<T, ValidationError>;
