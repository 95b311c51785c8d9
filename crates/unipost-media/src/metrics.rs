//! Encode metrics collection.
//!
//! Provides standardized metrics for monitoring encoding:
//! - Encode counters by backend and status
//! - Encode duration histograms

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Total encode attempts by backend and status.
    pub const ENCODES_TOTAL: &str = "unipost_encodes_total";

    /// Encode duration in seconds by backend.
    pub const ENCODE_SECONDS: &str = "unipost_encode_seconds";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record one encode attempt.
pub fn record_encode(backend: &str, success: bool, elapsed_secs: f64) {
    let status = if success { "ok" } else { "error" };

    counter!(
        names::ENCODES_TOTAL,
        "backend" => backend.to_string(),
        "status" => status
    )
    .increment(1);

    histogram!(
        names::ENCODE_SECONDS,
        "backend" => backend.to_string()
    )
    .record(elapsed_secs);
}

// =============================================================================
// Tests
// =============================================================================
