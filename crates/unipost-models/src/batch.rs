//! Batch request validation and the final batch report.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::account::AccountTarget;
use crate::error::ValidationError;
use crate::timestamp::parse_scheduled_at;

/// Unique identifier for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wire shape of a batch submission.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchRequest {
    /// Local path of the uploaded source video
    pub source_path: PathBuf,

    /// Destination accounts
    pub targets: Vec<AccountTarget>,

    /// Publish time; RFC 3339, or naive MSK
    pub scheduled_at: String,

    /// Shared post caption
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    /// Selector seed override for reproducible re-runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl BatchRequest {
    /// Validate into a typed [`Batch`].
    ///
    /// Every entry check happens here, once: non-empty source and targets,
    /// per-target shape, duplicate targets, and a strictly-future schedule.
    /// A past `scheduled_at` is rejected outright, never clamped forward.
    pub fn validate(self, now: DateTime<Utc>) -> Result<Batch, ValidationError> {
        if self.source_path.as_os_str().is_empty() {
            return Err(ValidationError::EmptySourcePath);
        }
        if self.targets.is_empty() {
            return Err(ValidationError::EmptyTargets);
        }
        let mut seen = HashSet::new();
        for target in &self.targets {
            target.validate()?;
            if !seen.insert(target.salt()) {
                return Err(ValidationError::DuplicateTarget(target.to_string()));
            }
        }
        let scheduled_at = parse_scheduled_at(&self.scheduled_at)?;
        if scheduled_at <= now {
            return Err(ValidationError::ScheduledAtInPast(self.scheduled_at));
        }
        Ok(Batch {
            id: BatchId::new(),
            source_path: self.source_path,
            targets: self.targets,
            scheduled_at,
            caption: self.caption,
            seed: self.seed,
            created_at: now,
        })
    }
}

/// A validated batch. Downstream stages never re-validate it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Batch {
    pub id: BatchId,
    pub source_path: PathBuf,
    pub targets: Vec<AccountTarget>,
    pub scheduled_at: DateTime<Utc>,
    pub caption: Option<String>,
    pub seed: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// Pipeline stage where an account dropped out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Variant could not be produced; target excluded from publishing
    Uniqueization,
    /// Publish job ended `Failed`
    Publish,
    /// Batch aborted before this account was dispatched
    Cancelled,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Uniqueization => "uniqueization",
            FailureStage::Publish => "publish",
            FailureStage::Cancelled => "cancelled",
        }
    }
}

/// One excluded or failed account in the final report.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchFailure {
    pub account: AccountTarget,
    pub stage: FailureStage,
    pub reason: String,
}

/// Final report for one batch.
///
/// Always well-formed, even when every account failed: a fully failed
/// batch reports `published = 0`, it is not an error.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchResult {
    /// Accounts selected by the caller
    pub total_accounts: usize,

    /// Variants actually submitted to the publish stage
    pub total_videos: usize,

    /// Posts the provider acknowledged
    pub published: usize,

    /// Every account that did not publish, with stage and reason
    pub failures: Vec<BatchFailure>,
}
