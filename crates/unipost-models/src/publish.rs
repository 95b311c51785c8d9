//! Publish jobs and their state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::account::AccountTarget;
use crate::media::VariantId;

/// Unique identifier for a publish job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Publish job state.
///
/// `Pending -> InFlight -> {Succeeded, Failed}`, or `Pending -> Cancelled`
/// when the batch is aborted before dispatch. `Cancelled` always means the
/// provider was never contacted for this job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Constructed, not yet sent
    #[default]
    Pending,
    /// Request issued to the provider
    InFlight,
    /// Provider acknowledged the scheduled post
    Succeeded,
    /// Rejected, or retries exhausted
    Failed,
    /// Batch aborted before this job was dispatched
    Cancelled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::InFlight => "in_flight",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled
        )
    }
}

/// One scheduled post of one variant to one account.
///
/// Each (account, variant) pair is submitted at most once per batch;
/// retries resend this same job, they never create a second one.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PublishJob {
    /// Unique job ID
    pub id: JobId,

    /// Destination account
    pub target: AccountTarget,

    /// Variant assigned to this account
    pub variant_id: VariantId,

    /// Publicly reachable URL of the variant
    pub video_url: String,

    /// Shared post caption
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    /// Scheduled publish time
    pub scheduled_at: DateTime<Utc>,

    /// Job state
    #[serde(default)]
    pub state: JobState,

    /// Provider attempts made so far
    #[serde(default)]
    pub attempts: u32,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Provider-side post ID after acknowledgement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_post_id: Option<i64>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl PublishJob {
    pub fn new(
        target: AccountTarget,
        variant_id: VariantId,
        video_url: impl Into<String>,
        caption: Option<String>,
        scheduled_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            target,
            variant_id,
            video_url: video_url.into(),
            caption,
            scheduled_at,
            state: JobState::Pending,
            attempts: 0,
            error_message: None,
            provider_post_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the job as dispatched to the provider.
    pub fn start(mut self) -> Self {
        self.state = JobState::InFlight;
        self.updated_at = Utc::now();
        self
    }

    /// Count one provider attempt.
    pub fn record_attempt(mut self) -> Self {
        self.attempts += 1;
        self.updated_at = Utc::now();
        self
    }

    /// Record provider acknowledgement.
    pub fn succeed(mut self, post_id: Option<i64>) -> Self {
        self.state = JobState::Succeeded;
        self.provider_post_id = post_id;
        self.updated_at = Utc::now();
        self
    }

    /// Record a terminal failure.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.state = JobState::Failed;
        self.error_message = Some(error.into());
        self.updated_at = Utc::now();
        self
    }

    /// Cancel a job that never left `Pending`.
    pub fn cancel(mut self) -> Self {
        self.state = JobState::Cancelled;
        self.updated_at = Utc::now();
        self
    }

    /// Collapse into the outcome handed to the aggregator.
    pub fn into_outcome(self) -> JobOutcome {
        JobOutcome {
            job_id: self.id,
            target: self.target,
            state: self.state,
            attempts: self.attempts,
            error: self.error_message,
            provider_post_id: self.provider_post_id,
        }
    }
}

/// Terminal result of one publish job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub target: AccountTarget,
    pub state: JobState,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_post_id: Option<i64>,
}
