//! Engine configuration.

use std::time::Duration;

use unipost_models::TransformBounds;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum concurrent publish jobs
    pub max_concurrent_publishes: usize,
    /// Per-publish-request timeout
    pub publish_timeout: Duration,
    /// Retries per publish job after the initial attempt
    pub max_publish_retries: u32,
    /// Base delay for publish retry backoff
    pub retry_base_delay: Duration,
    /// Ceiling on the publish retry backoff
    pub retry_max_delay: Duration,
    /// Seconds before a stuck encode is killed
    pub encode_timeout_secs: u64,
    /// Concurrent encoder sessions (hardware encoders usually allow 1)
    pub encoder_sessions: usize,
    /// Whether libx264 may serve as primary or fallback backend
    pub allow_software_fallback: bool,
    /// Work directory for intermediate variant files
    pub work_dir: String,
    /// Directory the variant store serves from
    pub store_dir: String,
    /// Public URL base the store derives variant URLs from
    pub public_base_url: String,
    /// Keep intermediate files after the batch finishes
    pub keep_artifacts: bool,
    /// Transform knob bounds for the selector
    pub bounds: TransformBounds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_publishes: 4,
            publish_timeout: Duration::from_secs(120),
            max_publish_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(30),
            encode_timeout_secs: 600,
            encoder_sessions: 1,
            allow_software_fallback: true,
            work_dir: "data/work".to_string(),
            store_dir: "data/public".to_string(),
            public_base_url: "http://localhost:8080/variants".to_string(),
            keep_artifacts: false,
            bounds: TransformBounds::default(),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_publishes: std::env::var("UNIPOST_MAX_PUBLISH_PARALLEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
            publish_timeout: Duration::from_secs(
                std::env::var("UNIPOST_PUBLISH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            max_publish_retries: std::env::var("UNIPOST_PUBLISH_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_base_delay: Duration::from_millis(
                std::env::var("UNIPOST_RETRY_BASE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            retry_max_delay: Duration::from_millis(
                std::env::var("UNIPOST_RETRY_MAX_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30_000),
            ),
            encode_timeout_secs: std::env::var("UNIPOST_ENCODE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(600),
            encoder_sessions: std::env::var("UNIPOST_ENCODER_SESSIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            allow_software_fallback: std::env::var("UNIPOST_SOFTWARE_FALLBACK")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
            work_dir: std::env::var("UNIPOST_WORK_DIR").unwrap_or_else(|_| "data/work".to_string()),
            store_dir: std::env::var("UNIPOST_STORE_DIR")
                .unwrap_or_else(|_| "data/public".to_string()),
            public_base_url: std::env::var("PUBLISH_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/variants".to_string()),
            keep_artifacts: std::env::var("UNIPOST_KEEP_ARTIFACTS")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(false),
            bounds: std::env::var("UNIPOST_TRANSFORM_BOUNDS")
                .ok()
                .and_then(|raw| serde_json::from_str(&raw).ok())
                .unwrap_or_default(),
        }
    }
}
