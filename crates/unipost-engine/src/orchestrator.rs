//! Publish job dispatch.
//!
//! One tokio task per job under a shared permit ceiling. Jobs are
//! isolated: the only thing they share is the provider client and the
//! semaphore, and every job comes back as a terminal outcome.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};

use unipost_models::{JobOutcome, JobState, PublishJob};
use unipost_provider::{ProviderError, Publish, SchedulePost};

use crate::config::EngineConfig;
use crate::metrics;
use crate::retry::RetryConfig;

/// Dispatch policy for one batch.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Concurrent publish jobs
    pub max_parallel: usize,
    /// Ceiling on one provider attempt
    pub job_timeout: Duration,
    /// Backoff schedule for transient failures
    pub retry: RetryConfig,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            max_parallel: 4,
            job_timeout: Duration::from_secs(120),
            retry: RetryConfig::new("publish"),
        }
    }
}

impl DispatchOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_parallel: config.max_concurrent_publishes,
            job_timeout: config.publish_timeout,
            retry: RetryConfig::new("publish")
                .with_max_retries(config.max_publish_retries)
                .with_base_delay(config.retry_base_delay)
                .with_max_delay(config.retry_max_delay),
        }
    }
}

/// Run every job to a terminal state and collect the outcomes.
///
/// Outcomes come back in job order regardless of completion order. A
/// panicking job task is recorded as `Failed`; it never takes down the
/// batch.
pub async fn dispatch(
    publisher: Arc<dyn Publish>,
    jobs: Vec<PublishJob>,
    opts: DispatchOptions,
    cancel_rx: Option<watch::Receiver<bool>>,
) -> Vec<JobOutcome> {
    let semaphore = Arc::new(Semaphore::new(opts.max_parallel.max(1)));
    let opts = Arc::new(opts);

    let mut handles = Vec::with_capacity(jobs.len());
    for job in jobs {
        let job_id = job.id.clone();
        let target = job.target.clone();
        let publisher = Arc::clone(&publisher);
        let semaphore = Arc::clone(&semaphore);
        let opts = Arc::clone(&opts);
        let cancel_rx = cancel_rx.clone();

        let handle = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("Semaphore closed");
            run_job(publisher.as_ref(), job, &opts, cancel_rx).await
        });
        handles.push((job_id, target, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (job_id, target, handle) in handles {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Publish job task panicked");
                outcomes.push(JobOutcome {
                    job_id,
                    target,
                    state: JobState::Failed,
                    attempts: 0,
                    error: Some(format!("job task panicked: {}", e)),
                    provider_post_id: None,
                });
            }
        }
    }
    outcomes
}

/// Drive one job through `Pending -> InFlight -> terminal`.
async fn run_job(
    publisher: &dyn Publish,
    job: PublishJob,
    opts: &DispatchOptions,
    cancel_rx: Option<watch::Receiver<bool>>,
) -> JobOutcome {
    // Cancellation observed while still Pending never contacts the provider
    if is_cancelled(&cancel_rx) {
        info!(job_id = %job.id, account = %job.target, "Job cancelled before dispatch");
        metrics::record_publish_outcome("cancelled");
        return job.cancel().into_outcome();
    }

    let post = SchedulePost {
        target: job.target.clone(),
        video_url: job.video_url.clone(),
        caption: job.caption.clone(),
        date_unix: job.scheduled_at.timestamp(),
    };

    let mut job = job.start();

    loop {
        job = job.record_attempt();
        let attempt = job.attempts;

        let error = match tokio::time::timeout(opts.job_timeout, publisher.schedule_post(&post))
            .await
        {
            Ok(Ok(receipt)) => {
                info!(
                    job_id = %job.id,
                    account = %job.target,
                    attempts = attempt,
                    post_id = ?receipt.post_id,
                    "Publish succeeded"
                );
                metrics::record_publish_outcome("succeeded");
                return job.succeed(receipt.post_id).into_outcome();
            }
            Ok(Err(e)) => e,
            Err(_) => ProviderError::Timeout(opts.job_timeout.as_secs()),
        };

        if !error.is_transient() {
            warn!(job_id = %job.id, account = %job.target, error = %error, "Publish rejected");
            metrics::record_publish_outcome("failed");
            return job.fail(error.to_string()).into_outcome();
        }

        // attempts counts the initial try as well
        if attempt > opts.retry.max_retries {
            warn!(
                job_id = %job.id,
                account = %job.target,
                attempts = attempt,
                error = %error,
                "Publish retries exhausted"
            );
            metrics::record_publish_outcome("failed");
            return job
                .fail(format!("retries exhausted: {}", error))
                .into_outcome();
        }

        let delay = opts.retry.delay_for_attempt(attempt);
        debug!(
            job_id = %job.id,
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Transient publish failure, backing off"
        );
        metrics::record_publish_retry();

        if backoff(delay, cancel_rx.clone()).await == Backoff::Interrupted {
            // The provider was already contacted for this job, so it
            // terminates as Failed, never Cancelled
            warn!(job_id = %job.id, account = %job.target, "Cancelled during retry backoff");
            metrics::record_publish_outcome("failed");
            return job
                .fail(format!("cancelled during retry backoff: {}", error))
                .into_outcome();
        }
    }
}

#[derive(Debug, PartialEq)]
enum Backoff {
    Completed,
    Interrupted,
}

/// Sleep out the delay unless cancellation arrives first.
async fn backoff(delay: Duration, cancel_rx: Option<watch::Receiver<bool>>) -> Backoff {
    let mut rx = match cancel_rx {
        Some(rx) => rx,
        None => {
            tokio::time::sleep(delay).await;
            return Backoff::Completed;
        }
    };

    if *rx.borrow() {
        return Backoff::Interrupted;
    }

    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return Backoff::Completed,
            changed = rx.changed() => match changed {
                Ok(()) if *rx.borrow() => return Backoff::Interrupted,
                Ok(()) => {}
                Err(_) => {
                    // Sender gone; nobody can cancel anymore
                    (&mut sleep).await;
                    return Backoff::Completed;
                }
            },
        }
    }
}

fn is_cancelled(cancel_rx: &Option<watch::Receiver<bool>>) -> bool {
    cancel_rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
}
