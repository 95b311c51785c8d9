//! Provider request metrics.

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Total provider requests by HTTP status.
    pub const PUBLISH_REQUESTS_TOTAL: &str = "unipost_publish_requests_total";

    /// Provider request latency in seconds.
    pub const PUBLISH_LATENCY_SECONDS: &str = "unipost_publish_latency_seconds";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record one provider request.
pub fn record_publish_request(status: u16, latency_secs: f64) {
    counter!(
        names::PUBLISH_REQUESTS_TOTAL,
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(names::PUBLISH_LATENCY_SECONDS).record(latency_secs);
}
