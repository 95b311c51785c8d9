//! Video uniqueization and publishing pipeline.
//!
//! This crate provides:
//! - Per-account variant production with retry-once policies
//! - Bounded-concurrency publish dispatch with backoff and cancellation
//! - Batch result aggregation
//! - The batch runner binding validation, the capability probe, and the
//!   encoder/store/publisher seams together

pub mod aggregate;
pub mod batch;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod retry;
pub mod store;
pub mod uniqueize;

pub use batch::BatchRunner;
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use logging::BatchLogger;
pub use orchestrator::DispatchOptions;
pub use store::{LocalDirStore, VariantStore};
