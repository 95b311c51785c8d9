//! Batch runner: validation, capability probe, uniqueization, dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, OnceCell};
use tracing::{info, warn};

use unipost_media::{
    fs_utils, probe_media, EncodeOptions, EncoderCapabilities, MediaError, TransformSelector,
    VariantEncode, VariantEncoder,
};
use unipost_models::{
    Batch, BatchFailure, BatchRequest, BatchResult, FailureStage, PublishJob, SourceMedia,
};
use unipost_provider::Publish;

use crate::aggregate::aggregate;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::logging::BatchLogger;
use crate::metrics;
use crate::orchestrator::{dispatch, DispatchOptions};
use crate::store::VariantStore;
use crate::uniqueize::uniqueize;

/// Runs batches end to end.
///
/// The encoder capability probe happens once per runner and its result is
/// cached, including a negative one: a host without any usable backend
/// fails every batch fast instead of re-probing.
pub struct BatchRunner {
    config: EngineConfig,
    publisher: Arc<dyn Publish>,
    store: Arc<dyn VariantStore>,
    caps: OnceCell<Option<EncoderCapabilities>>,
    encoder_override: Option<Arc<dyn VariantEncode>>,
    cancel: watch::Sender<bool>,
}

impl BatchRunner {
    pub fn new(
        config: EngineConfig,
        publisher: Arc<dyn Publish>,
        store: Arc<dyn VariantStore>,
    ) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            config,
            publisher,
            store,
            caps: OnceCell::new(),
            encoder_override: None,
            cancel,
        }
    }

    /// Replace the FFmpeg-backed encoder, for tests that run without one.
    pub fn with_encoder(mut self, encoder: Arc<dyn VariantEncode>) -> Self {
        self.encoder_override = Some(encoder);
        self
    }

    /// Pre-seed the capability probe result instead of detecting on first
    /// use. `None` behaves like a probe that found no backend.
    pub fn with_capabilities(mut self, caps: Option<EncoderCapabilities>) -> Self {
        self.caps = OnceCell::new_with(Some(caps));
        self
    }

    /// Signal batch cancellation. In-flight encodes and publishes finish;
    /// nothing new starts, and pending jobs become `Cancelled`.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Validate and run one batch from the wire shape.
    pub async fn run(&self, request: BatchRequest) -> EngineResult<BatchResult> {
        let batch = request.validate(Utc::now())?;
        info!(
            batch_id = %batch.id,
            accounts = batch.targets.len(),
            scheduled_at = %batch.scheduled_at,
            "Batch validated"
        );

        let probed = probe_media(&batch.source_path).await?;
        let checksum = fs_utils::sha256_file(&batch.source_path).await?;
        let source = probed.into_source(batch.source_path.clone(), checksum);

        self.run_prepared(batch, source).await
    }

    /// Run a validated batch against an already-probed source.
    pub async fn run_prepared(
        &self,
        batch: Batch,
        source: SourceMedia,
    ) -> EngineResult<BatchResult> {
        let logger = BatchLogger::new(&batch.id, "batch");
        logger.log_start(&format!(
            "{} accounts, source {}",
            batch.targets.len(),
            source.path.display()
        ));

        self.config.bounds.validate()?;
        let encoder = self.resolve_encoder().await?;

        let seed = match batch.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random::<u64>();
                info!(batch_id = %batch.id, seed, "Drew selector seed for this batch");
                seed
            }
        };

        let selector = TransformSelector::new(self.config.bounds.clone());
        let work_dir = PathBuf::from(&self.config.work_dir).join(batch.id.as_str());
        tokio::fs::create_dir_all(&work_dir).await?;

        let cancel_rx = self.cancel.subscribe();

        let outcome = uniqueize(
            encoder.as_ref(),
            &selector,
            &batch,
            seed,
            &source,
            &work_dir,
            Some(cancel_rx.clone()),
        )
        .await;

        logger.log_progress(&format!(
            "{} variants produced, {} accounts excluded",
            outcome.produced.len(),
            outcome.failures.len()
        ));

        let mut failures = outcome.failures;
        let mut jobs = Vec::with_capacity(outcome.produced.len());
        for (target, variant) in outcome.produced {
            match self.store.store(&variant).await {
                Ok(url) => jobs.push(PublishJob::new(
                    target,
                    variant.id,
                    url,
                    batch.caption.clone(),
                    batch.scheduled_at,
                )),
                Err(e) => {
                    warn!(account = %target, error = %e, "Variant store failed");
                    failures.push(BatchFailure {
                        account: target,
                        stage: FailureStage::Uniqueization,
                        reason: format!("variant store failed: {}", e),
                    });
                }
            }
        }

        let opts = DispatchOptions::from_config(&self.config);
        let outcomes = dispatch(Arc::clone(&self.publisher), jobs, opts, Some(cancel_rx)).await;

        let result = aggregate(batch.targets.len(), &outcomes, failures);

        if !self.config.keep_artifacts {
            if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    logger.log_warning(&format!(
                        "failed to clean work dir {}: {}",
                        work_dir.display(),
                        e
                    ));
                }
            }
        }

        metrics::record_batch(result.published, result.failures.len());
        logger.log_completion(&format!(
            "published {}/{} across {} accounts",
            result.published, result.total_videos, result.total_accounts
        ));

        Ok(result)
    }

    async fn resolve_encoder(&self) -> EngineResult<Arc<dyn VariantEncode>> {
        if let Some(encoder) = &self.encoder_override {
            return Ok(Arc::clone(encoder));
        }

        let caps = self.capabilities().await?;
        let opts = EncodeOptions {
            timeout_secs: self.config.encode_timeout_secs,
            sessions: self.config.encoder_sessions,
        };
        let encoder = VariantEncoder::new(caps, self.config.bounds.clone(), opts)
            .with_cancel(self.cancel.subscribe());
        Ok(Arc::new(encoder))
    }

    async fn capabilities(&self) -> EngineResult<EncoderCapabilities> {
        let caps = self
            .caps
            .get_or_init(|| async {
                match EncoderCapabilities::detect(self.config.allow_software_fallback).await {
                    Ok(caps) => Some(caps),
                    Err(e) => {
                        warn!(error = %e, "Encoder capability probe failed");
                        None
                    }
                }
            })
            .await;

        match caps {
            Some(caps) => Ok(*caps),
            None => Err(EngineError::Media(MediaError::NoEncoderAvailable)),
        }
    }
}
