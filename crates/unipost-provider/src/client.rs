//! HTTP client for the publishing provider.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use unipost_models::AccountTarget;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::metrics;
use crate::wire::{ApiEnvelope, PostGroup, PostponeRequest, PostponeResponse, WirePost};

/// How much of an HTTP error body to keep in the error message.
const ERROR_BODY_MAX_CHARS: usize = 500;

/// One post to schedule through the provider.
#[derive(Debug, Clone)]
pub struct SchedulePost {
    pub target: AccountTarget,
    pub video_url: String,
    pub caption: Option<String>,
    /// Publish time as unix seconds
    pub date_unix: i64,
}

/// Provider acknowledgement for one scheduled post.
#[derive(Debug, Clone, PartialEq)]
pub struct PostReceipt {
    /// Provider-side post ID, when the provider returns one
    pub post_id: Option<i64>,
}

/// Seam the orchestrator publishes through.
///
/// Implementations perform exactly one provider call per invocation.
/// Retry policy lives with the caller so attempt accounting has a single
/// owner.
#[async_trait]
pub trait Publish: Send + Sync {
    async fn schedule_post(&self, post: &SchedulePost) -> ProviderResult<PostReceipt>;
}

/// Client for the publishing provider API.
pub struct ProviderClient {
    client: Client,
    config: ProviderConfig,
    token: String,
}

impl ProviderClient {
    /// Create a new provider client.
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let token = config.clean_token()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(ProviderError::Network)?;

        Ok(Self {
            client,
            config,
            token,
        })
    }

    /// Create client from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Self::new(ProviderConfig::from_env())
    }

    fn postpone_url(&self) -> String {
        format!("{}v1/posts/postpone", self.config.api_url)
    }
}

#[async_trait]
impl Publish for ProviderClient {
    async fn schedule_post(&self, post: &SchedulePost) -> ProviderResult<PostReceipt> {
        let body = PostponeRequest {
            posts: vec![WirePost::new(
                PostGroup::from(&post.target),
                post.caption.as_deref(),
                &post.video_url,
                post.date_unix,
            )],
        };

        debug!(
            account = %post.target,
            date_unix = post.date_unix,
            "Scheduling post with provider"
        );

        let started = Instant::now();
        let response = self
            .client
            .post(self.postpone_url())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.config.timeout.as_secs())
                } else {
                    ProviderError::Network(e)
                }
            })?;

        let status = response.status();
        metrics::record_publish_request(status.as_u16(), started.elapsed().as_secs_f64());

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                account = %post.target,
                "Provider returned an HTTP error"
            );
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                message: cap_chars(&message, ERROR_BODY_MAX_CHARS),
            });
        }

        let envelope: ApiEnvelope<PostponeResponse> = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if !envelope.success {
            let message = envelope
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| "provider reported failure without a message".to_string());
            return Err(ProviderError::Rejected(message));
        }

        let post_id = envelope
            .response
            .and_then(|r| r.posts.into_iter().next())
            .and_then(|p| p.id);

        debug!(account = %post.target, ?post_id, "Post accepted by provider");

        Ok(PostReceipt { post_id })
    }
}

/// Keep the leading part of an oversized message, char-safe.
fn cap_chars(message: &str, max_chars: usize) -> String {
    if message.chars().count() <= max_chars {
        message.to_string()
    } else {
        message.chars().take(max_chars).collect()
    }
}
