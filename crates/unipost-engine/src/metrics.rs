//! Engine metrics collection.
//!
//! Provides standardized metrics for monitoring the pipeline:
//! - Batch counters with published/failed splits
//! - Publish job outcomes and retry counts
//! - Uniqueization failures

use metrics::counter;

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Total batches processed.
    pub const BATCHES_TOTAL: &str = "unipost_batches_total";

    /// Posts acknowledged by the provider.
    pub const PUBLISHED_TOTAL: &str = "unipost_published_total";

    /// Accounts that did not publish, across all stages.
    pub const FAILURES_TOTAL: &str = "unipost_failures_total";

    /// Publish job outcomes by terminal state.
    pub const PUBLISH_JOBS_TOTAL: &str = "unipost_publish_jobs_total";

    /// Publish attempts retried after a transient failure.
    pub const PUBLISH_RETRIES_TOTAL: &str = "unipost_publish_retries_total";

    /// Targets excluded during uniqueization.
    pub const UNIQUEIZATION_FAILURES_TOTAL: &str = "unipost_uniqueization_failures_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record one finished batch.
pub fn record_batch(published: usize, failures: usize) {
    counter!(names::BATCHES_TOTAL).increment(1);
    counter!(names::PUBLISHED_TOTAL).increment(published as u64);
    counter!(names::FAILURES_TOTAL).increment(failures as u64);
}

/// Record a publish job reaching a terminal state.
pub fn record_publish_outcome(outcome: &'static str) {
    counter!(names::PUBLISH_JOBS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record one backoff retry.
pub fn record_publish_retry() {
    counter!(names::PUBLISH_RETRIES_TOTAL).increment(1);
}

/// Record one excluded target.
pub fn record_uniqueization_failure() {
    counter!(names::UNIQUEIZATION_FAILURES_TOTAL).increment(1);
}
