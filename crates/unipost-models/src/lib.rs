//! Shared data models for the unipost pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Publish targets and platforms
//! - Transformation specs and their configured bounds
//! - Probed source media and encoded variants
//! - Publish jobs and their state machine
//! - Batch requests, validation, and the final batch report

pub mod account;
pub mod batch;
pub mod error;
pub mod media;
pub mod publish;
pub mod timestamp;
pub mod transform;

// Re-export common types
pub use account::{AccountId, AccountKind, AccountTarget, Platform};
pub use batch::{Batch, BatchFailure, BatchId, BatchRequest, BatchResult, FailureStage};
pub use error::{ValidationError, ValidationResult};
pub use media::{SourceMedia, Variant, VariantId};
pub use publish::{JobId, JobOutcome, JobState, PublishJob};
pub use transform::{Bounds, IntBounds, TransformBounds, TransformSpec};
