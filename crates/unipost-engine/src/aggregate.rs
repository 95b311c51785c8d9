//! Batch result aggregation.

use unipost_models::{BatchFailure, BatchResult, FailureStage, JobOutcome, JobState};

/// Fold job outcomes and pre-dispatch failures into the final report.
///
/// Purely additive and infallible: a batch where every job failed still
/// aggregates into a well-formed result with `published = 0`.
pub fn aggregate(
    total_accounts: usize,
    outcomes: &[JobOutcome],
    pre_dispatch_failures: Vec<BatchFailure>,
) -> BatchResult {
    let published = outcomes
        .iter()
        .filter(|o| o.state == JobState::Succeeded)
        .count();

    let mut failures = pre_dispatch_failures;
    for outcome in outcomes {
        match outcome.state {
            JobState::Succeeded => {}
            JobState::Cancelled => failures.push(BatchFailure {
                account: outcome.target.clone(),
                stage: FailureStage::Cancelled,
                reason: "batch cancelled before dispatch".to_string(),
            }),
            _ => failures.push(BatchFailure {
                account: outcome.target.clone(),
                stage: FailureStage::Publish,
                reason: outcome.error.clone().unwrap_or_else(|| {
                    format!("job ended in state {}", outcome.state.as_str())
                }),
            }),
        }
    }

    BatchResult {
        total_accounts,
        total_videos: outcomes.len(),
        published,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unipost_models::{AccountKind, AccountTarget, JobId, Platform};

    fn outcome(id: &str, state: JobState, error: Option<&str>) -> JobOutcome {
        JobOutcome {
            job_id: JobId::new(),
            target: AccountTarget::new(id, Platform::Vk, AccountKind::Group),
            state,
            attempts: 1,
            error: error.map(|e| e.to_string()),
            provider_post_id: None,
        }
    }

    #[test]
    fn test_counts_published_and_failures() {
        let outcomes = vec![
            outcome("a", JobState::Succeeded, None),
            outcome("b", JobState::Failed, Some("rejected")),
            outcome("c", JobState::Succeeded, None),
        ];

        let result = aggregate(4, &outcomes, Vec::new());

        assert_eq!(result.total_accounts, 4);
        assert_eq!(result.total_videos, 3);
        assert_eq!(result.published, 2);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].stage, FailureStage::Publish);
        assert_eq!(result.failures[0].reason, "rejected");
    }

    #[test]
    fn test_pre_dispatch_failures_come_first() {
        let pre = vec![BatchFailure {
            account: AccountTarget::new("x", Platform::Instagram, AccountKind::User),
            stage: FailureStage::Uniqueization,
            reason: "encode failed".to_string(),
        }];
        let outcomes = vec![outcome("a", JobState::Succeeded, None)];

        let result = aggregate(2, &outcomes, pre);

        assert_eq!(result.published, 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].stage, FailureStage::Uniqueization);
    }

    #[test]
    fn test_fully_failed_batch_is_still_well_formed() {
        let outcomes = vec![
            outcome("a", JobState::Failed, Some("down")),
            outcome("b", JobState::Failed, Some("down")),
        ];

        let result = aggregate(2, &outcomes, Vec::new());

        assert_eq!(result.published, 0);
        assert_eq!(result.failures.len(), 2);
        assert!(result.published <= result.total_videos);
        assert!(result.total_videos <= result.total_accounts);
    }

    #[test]
    fn test_cancelled_jobs_report_their_stage() {
        let outcomes = vec![outcome("a", JobState::Cancelled, None)];
        let result = aggregate(1, &outcomes, Vec::new());

        assert_eq!(result.failures[0].stage, FailureStage::Cancelled);
    }
}
