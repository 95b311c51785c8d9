//! Per-account variant production.
//!
//! One variant per account target, sequentially (the encoder serializes
//! hardware sessions anyway). A target that cannot produce a variant is
//! excluded from publishing and reported; it never aborts the others.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::sync::watch;
use tracing::{info, warn};

use unipost_media::{MediaError, MediaResult, TransformSelector, VariantEncode};
use unipost_models::{
    AccountTarget, Batch, BatchFailure, FailureStage, SourceMedia, TransformSpec, Variant,
};

use crate::metrics;

/// Output of the uniqueization stage.
pub struct UniqueizeOutcome {
    /// Targets with a produced variant, in input order
    pub produced: Vec<(AccountTarget, Variant)>,
    /// Targets excluded from publishing
    pub failures: Vec<BatchFailure>,
}

/// Produce one distinct variant per account target.
///
/// Failure policy per target: a process failure on a hardware backend is
/// retried once on libx264 with the same spec; a validation failure (or a
/// checksum collision with the source or an earlier variant) gets exactly
/// one redraw with a shifted salt. Anything beyond that excludes the
/// target.
pub async fn uniqueize(
    encoder: &dyn VariantEncode,
    selector: &TransformSelector,
    batch: &Batch,
    seed: u64,
    source: &SourceMedia,
    work_dir: &Path,
    cancel_rx: Option<watch::Receiver<bool>>,
) -> UniqueizeOutcome {
    let mut produced: Vec<(AccountTarget, Variant)> = Vec::with_capacity(batch.targets.len());
    let mut failures = Vec::new();

    // The source checksum seeds the set so an ineffective transform is
    // caught even if the encoder's own validation missed it
    let mut seen_checksums: HashSet<String> = HashSet::new();
    seen_checksums.insert(source.checksum.clone());

    for (index, target) in batch.targets.iter().enumerate() {
        if is_cancelled(&cancel_rx) {
            failures.push(BatchFailure {
                account: target.clone(),
                stage: FailureStage::Cancelled,
                reason: "batch cancelled before encoding".to_string(),
            });
            continue;
        }

        let output = variant_path(work_dir, batch, index);
        match produce(encoder, selector, seed, source, target, &output, &seen_checksums).await {
            Ok(variant) => {
                info!(
                    account = %target,
                    variant_id = %variant.id,
                    checksum = %variant.checksum,
                    "Variant produced"
                );
                seen_checksums.insert(variant.checksum.clone());
                produced.push((target.clone(), variant));
            }
            Err(reason) => {
                warn!(account = %target, reason = %reason, "Uniqueization failed for account");
                metrics::record_uniqueization_failure();
                failures.push(BatchFailure {
                    account: target.clone(),
                    stage: FailureStage::Uniqueization,
                    reason,
                });
            }
        }
    }

    UniqueizeOutcome { produced, failures }
}

/// Produce a variant for one target, applying the retry-once policies.
async fn produce(
    encoder: &dyn VariantEncode,
    selector: &TransformSelector,
    seed: u64,
    source: &SourceMedia,
    target: &AccountTarget,
    output: &Path,
    seen: &HashSet<String>,
) -> Result<Variant, String> {
    let salt = target.salt();
    let spec = selector.select(seed, &salt);

    match encode_checked(encoder, source, &spec, output, seen).await {
        Ok(variant) => Ok(variant),
        Err(e) if e.is_validation_failure() => {
            warn!(account = %target, error = %e, "Variant rejected, redrawing once");
            let respec = selector.select(seed, &retry_salt(&salt));
            encode_checked(encoder, source, &respec, output, seen)
                .await
                .map_err(|e| format!("redrawn variant also rejected: {}", e))
        }
        Err(e) => Err(e.to_string()),
    }
}

/// One encode attempt: hardware with software fallback on process
/// failure, then batch-level distinctness on top of the encoder's own
/// output validation.
async fn encode_checked(
    encoder: &dyn VariantEncode,
    source: &SourceMedia,
    spec: &TransformSpec,
    output: &Path,
    seen: &HashSet<String>,
) -> MediaResult<Variant> {
    let variant = match encoder.encode(source, spec, output).await {
        Err(e) if e.is_process_failure() && encoder.has_software_fallback() => {
            warn!(error = %e, "Hardware encode failed, falling back to software");
            encoder.encode_software(source, spec, output).await?
        }
        other => other?,
    };

    if seen.contains(&variant.checksum) {
        return Err(MediaError::validation_failed(
            "variant checksum collides with an earlier variant",
        ));
    }
    Ok(variant)
}

/// Salt for the single redraw after a rejected variant.
fn retry_salt(salt: &str) -> String {
    format!("{}/retry", salt)
}

fn variant_path(work_dir: &Path, batch: &Batch, index: usize) -> PathBuf {
    work_dir.join(format!("{}-{:02}.mp4", batch.id.as_str(), index))
}

fn is_cancelled(cancel_rx: &Option<watch::Receiver<bool>>) -> bool {
    cancel_rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
}
