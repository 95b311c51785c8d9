//! End-to-end batch scenarios against in-memory seams.
//!
//! The encoder, variant store, and publisher are replaced with fakes so
//! these exercise validation, uniqueization policy, dispatch, and
//! aggregation without ffmpeg or network access.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use unipost_engine::uniqueize::uniqueize;
use unipost_engine::{BatchRunner, EngineConfig, EngineError, VariantStore};
use unipost_media::{
    EncoderBackend, MediaError, MediaResult, TransformSelector, VariantEncode,
};
use unipost_models::{
    AccountKind, AccountTarget, Batch, BatchRequest, FailureStage, Platform, SourceMedia,
    TransformSpec, ValidationError, Variant, VariantId,
};
use unipost_provider::{PostReceipt, ProviderError, ProviderResult, Publish, SchedulePost};

// =============================================================================
// Fakes
// =============================================================================

/// Encoder fake: derives a checksum from the drawn spec, touches no files.
#[derive(Default)]
struct FakeEncoder {
    calls: AtomicU32,
    /// Fail this many leading encode calls with a validation error
    validation_failures: u32,
}

impl FakeEncoder {
    fn failing_validation(times: u32) -> Self {
        Self {
            calls: AtomicU32::new(0),
            validation_failures: times,
        }
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

fn spec_checksum(spec: &TransformSpec) -> String {
    let bits = spec.hue_shift_deg.to_bits()
        ^ spec.noise_level.to_bits().rotate_left(17)
        ^ spec.speed_factor.to_bits().rotate_left(34)
        ^ spec.brightness_delta.to_bits().rotate_left(51);
    format!("{:016x}", bits)
}

#[async_trait]
impl VariantEncode for FakeEncoder {
    fn backend(&self) -> EncoderBackend {
        EncoderBackend::Software
    }

    fn has_software_fallback(&self) -> bool {
        false
    }

    async fn encode(
        &self,
        _source: &SourceMedia,
        spec: &TransformSpec,
        output: &Path,
    ) -> MediaResult<Variant> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.validation_failures {
            return Err(MediaError::validation_failed("duration drifted out of tolerance"));
        }
        Ok(Variant {
            id: VariantId::new(),
            path: output.to_path_buf(),
            spec: spec.clone(),
            size_bytes: 1024,
            checksum: spec_checksum(spec),
        })
    }

    async fn encode_software(
        &self,
        source: &SourceMedia,
        spec: &TransformSpec,
        output: &Path,
    ) -> MediaResult<Variant> {
        self.encode(source, spec, output).await
    }
}

/// Store fake: records URLs, moves nothing.
#[derive(Default)]
struct FakeStore {
    stored: Mutex<Vec<String>>,
}

impl FakeStore {
    fn stored_count(&self) -> usize {
        self.stored.lock().unwrap().len()
    }
}

#[async_trait]
impl VariantStore for FakeStore {
    async fn store(&self, variant: &Variant) -> Result<String, EngineError> {
        let url = format!("https://cdn.test/{}.mp4", variant.id);
        self.stored.lock().unwrap().push(url.clone());
        Ok(url)
    }
}

/// Store fake that always fails.
struct BrokenStore;

#[async_trait]
impl VariantStore for BrokenStore {
    async fn store(&self, _variant: &Variant) -> Result<String, EngineError> {
        Err(EngineError::store("served directory is read-only"))
    }
}

/// Publisher fake scripted per account id.
#[derive(Default)]
struct CountingPublisher {
    per_account: Mutex<HashMap<String, u32>>,
    always_transient: Mutex<HashSet<String>>,
    flaky: Mutex<HashMap<String, u32>>,
}

impl CountingPublisher {
    fn always_transient(self, id: &str) -> Self {
        self.always_transient.lock().unwrap().insert(id.to_string());
        self
    }

    fn flaky(self, id: &str, failures: u32) -> Self {
        self.flaky.lock().unwrap().insert(id.to_string(), failures);
        self
    }

    fn total_calls(&self) -> u32 {
        self.per_account.lock().unwrap().values().sum()
    }

    fn calls_for(&self, id: &str) -> u32 {
        self.per_account
            .lock()
            .unwrap()
            .get(id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Publish for CountingPublisher {
    async fn schedule_post(&self, post: &SchedulePost) -> ProviderResult<PostReceipt> {
        let id = post.target.id.as_str().to_string();
        *self.per_account.lock().unwrap().entry(id.clone()).or_insert(0) += 1;

        if self.always_transient.lock().unwrap().contains(&id) {
            return Err(ProviderError::HttpStatus {
                status: 503,
                message: "unavailable".to_string(),
            });
        }

        let mut flaky = self.flaky.lock().unwrap();
        if let Some(remaining) = flaky.get_mut(&id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ProviderError::Timeout(1));
            }
        }

        Ok(PostReceipt { post_id: Some(9000) })
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn target(id: &str, platform: Platform) -> AccountTarget {
    AccountTarget::new(id, platform, AccountKind::Group)
}

fn three_targets() -> Vec<AccountTarget> {
    vec![
        target("alpha", Platform::Vk),
        target("beta", Platform::Vk),
        target("gamma", Platform::Instagram),
    ]
}

fn build_batch(targets: Vec<AccountTarget>) -> Batch {
    BatchRequest {
        source_path: PathBuf::from("/tmp/source.mp4"),
        targets,
        scheduled_at: (Utc::now() + ChronoDuration::hours(1)).to_rfc3339(),
        caption: None,
        seed: Some(42),
    }
    .validate(Utc::now())
    .unwrap()
}

fn test_source() -> SourceMedia {
    SourceMedia {
        path: PathBuf::from("/tmp/source.mp4"),
        container: "mp4".to_string(),
        duration_secs: 30.0,
        width: 1080,
        height: 1920,
        size_bytes: 10 * 1024 * 1024,
        bitrate_kbps: Some(4000),
        sample_rate: Some(44100),
        checksum: "source-checksum".to_string(),
    }
}

fn test_config(work_dir: &Path) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.max_publish_retries = 2;
    config.retry_base_delay = Duration::from_millis(5);
    config.retry_max_delay = Duration::from_millis(20);
    config.work_dir = work_dir.to_string_lossy().into_owned();
    config
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_full_batch_publishes_every_account() {
    let work = tempfile::tempdir().unwrap();
    let encoder = Arc::new(FakeEncoder::default());
    let store = Arc::new(FakeStore::default());
    let publisher = Arc::new(CountingPublisher::default());

    let runner = BatchRunner::new(test_config(work.path()), publisher.clone(), store.clone())
        .with_encoder(encoder.clone());

    let result = runner
        .run_prepared(build_batch(three_targets()), test_source())
        .await
        .unwrap();

    assert_eq!(result.total_accounts, 3);
    assert_eq!(result.total_videos, 3);
    assert_eq!(result.published, 3);
    assert!(result.failures.is_empty());
    assert_eq!(encoder.call_count(), 3);
    assert_eq!(store.stored_count(), 3);
    assert_eq!(publisher.total_calls(), 3);
}

#[tokio::test]
async fn test_past_schedule_is_rejected_before_any_work() {
    let work = tempfile::tempdir().unwrap();
    let encoder = Arc::new(FakeEncoder::default());
    let publisher = Arc::new(CountingPublisher::default());

    let runner = BatchRunner::new(
        test_config(work.path()),
        publisher.clone(),
        Arc::new(FakeStore::default()),
    )
    .with_encoder(encoder.clone());

    let request = BatchRequest {
        source_path: PathBuf::from("/tmp/source.mp4"),
        targets: three_targets(),
        scheduled_at: (Utc::now() - ChronoDuration::minutes(1)).to_rfc3339(),
        caption: None,
        seed: None,
    };

    let err = runner.run(request).await.unwrap_err();

    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::ScheduledAtInPast(_))
    ));
    assert!(err.is_fatal());
    assert_eq!(encoder.call_count(), 0);
    assert_eq!(publisher.total_calls(), 0);
}

#[tokio::test]
async fn test_missing_encoder_fails_batch_before_any_publish() {
    let work = tempfile::tempdir().unwrap();
    let publisher = Arc::new(CountingPublisher::default());
    let store = Arc::new(FakeStore::default());

    let runner = BatchRunner::new(test_config(work.path()), publisher.clone(), store.clone())
        .with_capabilities(None);

    let err = runner
        .run_prepared(build_batch(three_targets()), test_source())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Media(MediaError::NoEncoderAvailable)
    ));
    assert!(err.is_fatal());
    assert_eq!(publisher.total_calls(), 0);
    assert_eq!(store.stored_count(), 0);
}

#[tokio::test]
async fn test_partial_uniqueization_excludes_only_the_failed_target() {
    let work = tempfile::tempdir().unwrap();
    // Two validation failures burn the first target's draw and redraw
    let encoder = Arc::new(FakeEncoder::failing_validation(2));
    let publisher = Arc::new(CountingPublisher::default());

    let targets = vec![
        target("one", Platform::Vk),
        target("two", Platform::Vk),
        target("three", Platform::Instagram),
        target("four", Platform::Youtube),
        target("five", Platform::Pinterest),
    ];

    let runner = BatchRunner::new(
        test_config(work.path()),
        publisher.clone(),
        Arc::new(FakeStore::default()),
    )
    .with_encoder(encoder.clone());

    let result = runner
        .run_prepared(build_batch(targets), test_source())
        .await
        .unwrap();

    assert_eq!(result.total_accounts, 5);
    assert_eq!(result.total_videos, 4);
    assert_eq!(result.published, 4);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].stage, FailureStage::Uniqueization);
    assert_eq!(result.failures[0].account.id.as_str(), "one");
    assert_eq!(publisher.total_calls(), 4);
}

#[tokio::test]
async fn test_one_account_exhausting_retries_does_not_affect_others() {
    let work = tempfile::tempdir().unwrap();
    let publisher = Arc::new(CountingPublisher::default().always_transient("beta"));

    let runner = BatchRunner::new(
        test_config(work.path()),
        publisher.clone(),
        Arc::new(FakeStore::default()),
    )
    .with_encoder(Arc::new(FakeEncoder::default()));

    let result = runner
        .run_prepared(build_batch(three_targets()), test_source())
        .await
        .unwrap();

    assert_eq!(result.published, 2);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].stage, FailureStage::Publish);
    assert_eq!(result.failures[0].account.id.as_str(), "beta");
    assert!(result.failures[0].reason.contains("retries exhausted"));

    // initial attempt + 2 retries for the failing account, 1 for the rest
    assert_eq!(publisher.calls_for("beta"), 3);
    assert_eq!(publisher.calls_for("alpha"), 1);
    assert_eq!(publisher.calls_for("gamma"), 1);
}

#[tokio::test]
async fn test_flaky_account_is_published_exactly_once() {
    let work = tempfile::tempdir().unwrap();
    let publisher = Arc::new(CountingPublisher::default().flaky("alpha", 1));

    let runner = BatchRunner::new(
        test_config(work.path()),
        publisher.clone(),
        Arc::new(FakeStore::default()),
    )
    .with_encoder(Arc::new(FakeEncoder::default()));

    let result = runner
        .run_prepared(build_batch(three_targets()), test_source())
        .await
        .unwrap();

    assert_eq!(result.published, 3);
    assert!(result.failures.is_empty());
    assert_eq!(publisher.calls_for("alpha"), 2);
    assert_eq!(publisher.calls_for("beta"), 1);
    assert_eq!(publisher.calls_for("gamma"), 1);
}

#[tokio::test]
async fn test_store_failure_excludes_the_target() {
    let work = tempfile::tempdir().unwrap();
    let publisher = Arc::new(CountingPublisher::default());

    let runner = BatchRunner::new(
        test_config(work.path()),
        publisher.clone(),
        Arc::new(BrokenStore),
    )
    .with_encoder(Arc::new(FakeEncoder::default()));

    let result = runner
        .run_prepared(build_batch(three_targets()), test_source())
        .await
        .unwrap();

    assert_eq!(result.total_videos, 0);
    assert_eq!(result.published, 0);
    assert_eq!(result.failures.len(), 3);
    assert!(result
        .failures
        .iter()
        .all(|f| f.stage == FailureStage::Uniqueization));
    assert_eq!(publisher.total_calls(), 0);
}

#[tokio::test]
async fn test_cancelled_batch_contacts_nothing() {
    let work = tempfile::tempdir().unwrap();
    let encoder = Arc::new(FakeEncoder::default());
    let publisher = Arc::new(CountingPublisher::default());

    let runner = BatchRunner::new(
        test_config(work.path()),
        publisher.clone(),
        Arc::new(FakeStore::default()),
    )
    .with_encoder(encoder.clone());

    runner.cancel();
    let result = runner
        .run_prepared(build_batch(three_targets()), test_source())
        .await
        .unwrap();

    assert_eq!(result.total_videos, 0);
    assert_eq!(result.published, 0);
    assert_eq!(result.failures.len(), 3);
    assert!(result
        .failures
        .iter()
        .all(|f| f.stage == FailureStage::Cancelled));
    assert_eq!(encoder.call_count(), 0);
    assert_eq!(publisher.total_calls(), 0);
}

#[tokio::test]
async fn test_variants_in_one_batch_have_distinct_checksums() {
    let work = tempfile::tempdir().unwrap();
    let encoder = FakeEncoder::default();
    let selector = TransformSelector::new(Default::default());
    let batch = build_batch(vec![
        target("alpha", Platform::Vk),
        target("beta", Platform::Vk),
        target("gamma", Platform::Instagram),
        target("delta", Platform::Youtube),
    ]);
    let source = test_source();

    let outcome = uniqueize(&encoder, &selector, &batch, 42, &source, work.path(), None).await;

    assert_eq!(outcome.produced.len(), 4);
    assert!(outcome.failures.is_empty());

    let checksums: HashSet<&str> = outcome
        .produced
        .iter()
        .map(|(_, v)| v.checksum.as_str())
        .collect();
    assert_eq!(checksums.len(), 4);
    assert!(!checksums.contains(source.checksum.as_str()));
}

#[tokio::test]
async fn test_same_seed_reproduces_the_same_specs() {
    let work = tempfile::tempdir().unwrap();
    let selector = TransformSelector::new(Default::default());
    let batch = build_batch(three_targets());
    let source = test_source();

    let first = uniqueize(
        &FakeEncoder::default(),
        &selector,
        &batch,
        42,
        &source,
        work.path(),
        None,
    )
    .await;
    let second = uniqueize(
        &FakeEncoder::default(),
        &selector,
        &batch,
        42,
        &source,
        work.path(),
        None,
    )
    .await;

    let specs = |outcome: &unipost_engine::uniqueize::UniqueizeOutcome| -> Vec<TransformSpec> {
        outcome.produced.iter().map(|(_, v)| v.spec.clone()).collect()
    };
    assert_eq!(specs(&first), specs(&second));
}
