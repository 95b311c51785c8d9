//! Variant encoding with post-encode validation.
//!
//! The encoder turns one (source, spec) pair into one variant file:
//! metadata is stripped, filters translate the spec, the selected
//! backend encodes, and the result is probed back to confirm it really
//! is a valid, distinct rendition before anyone publishes it.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Semaphore};
use tracing::{info, warn};

use unipost_models::{SourceMedia, TransformBounds, TransformSpec, Variant, VariantId};

use crate::backend::{EncoderBackend, EncoderCapabilities};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{build_audio_filter, build_video_filter};
use crate::fs_utils::sha256_file;
use crate::metrics;
use crate::probe::probe_media;

/// Bitrate floor in kbit/s for the size-based estimate.
const MIN_BITRATE_KBPS: u32 = 1000;

/// kbit/s per megabyte of source, for containers that report no bitrate.
const BITRATE_PER_MB_KBPS: f64 = 200.0;

/// Absolute floor on the duration tolerance, in seconds.
const DURATION_TOLERANCE_FLOOR_SECS: f64 = 0.5;

/// Relative duration tolerance against the speed-adjusted source.
const DURATION_TOLERANCE_FRACTION: f64 = 0.02;

/// Default per-encode timeout in seconds.
const DEFAULT_ENCODE_TIMEOUT_SECS: u64 = 600;

/// Encoder tunables.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Seconds before a stuck encode is killed
    pub timeout_secs: u64,
    /// Concurrent encoder sessions; hardware encoders usually allow 1
    pub sessions: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_ENCODE_TIMEOUT_SECS,
            sessions: 1,
        }
    }
}

/// Encoding seam used by the uniqueization engine.
#[async_trait]
pub trait VariantEncode: Send + Sync {
    /// Backend used for primary encode attempts.
    fn backend(&self) -> EncoderBackend;

    /// Whether libx264 is available to retry a failed hardware encode.
    fn has_software_fallback(&self) -> bool;

    /// Encode one variant with the primary backend.
    async fn encode(
        &self,
        source: &SourceMedia,
        spec: &TransformSpec,
        output: &Path,
    ) -> MediaResult<Variant>;

    /// Encode one variant forcing the software backend.
    async fn encode_software(
        &self,
        source: &SourceMedia,
        spec: &TransformSpec,
        output: &Path,
    ) -> MediaResult<Variant>;
}

/// FFmpeg-backed implementation of [`VariantEncode`].
pub struct VariantEncoder {
    caps: EncoderCapabilities,
    bounds: TransformBounds,
    opts: EncodeOptions,
    /// Hardware sessions are a real resource; encodes queue here
    session: Arc<Semaphore>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl VariantEncoder {
    pub fn new(caps: EncoderCapabilities, bounds: TransformBounds, opts: EncodeOptions) -> Self {
        let session = Arc::new(Semaphore::new(opts.sessions.max(1)));
        Self {
            caps,
            bounds,
            opts,
            session,
            cancel_rx: None,
        }
    }

    /// Propagate a batch cancellation signal into encode runs.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    async fn encode_with(
        &self,
        backend: EncoderBackend,
        source: &SourceMedia,
        spec: &TransformSpec,
        output: &Path,
    ) -> MediaResult<Variant> {
        // Bounds may have drifted between selection and invocation
        self.bounds.check(spec)?;

        let _permit = self
            .session
            .clone()
            .acquire_owned()
            .await
            .expect("Semaphore closed");

        let started = Instant::now();
        let bitrate_kbps = target_bitrate_kbps(source, spec);
        let cmd = build_encode_command(backend, source, spec, output, bitrate_kbps);

        let mut runner = FfmpegRunner::new().with_timeout(self.opts.timeout_secs);
        if let Some(cancel) = &self.cancel_rx {
            runner = runner.with_cancel(cancel.clone());
        }

        let run_result = runner.run(&cmd).await;
        metrics::record_encode(
            backend.encoder_name(),
            run_result.is_ok(),
            started.elapsed().as_secs_f64(),
        );
        run_result?;

        let variant = validate_output(source, spec, output).await?;
        info!(
            backend = backend.encoder_name(),
            output = %output.display(),
            size_bytes = variant.size_bytes,
            bitrate_kbps,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Variant encoded"
        );
        Ok(variant)
    }
}

#[async_trait]
impl VariantEncode for VariantEncoder {
    fn backend(&self) -> EncoderBackend {
        self.caps.backend
    }

    fn has_software_fallback(&self) -> bool {
        self.caps.backend.is_hardware() && self.caps.software_available
    }

    async fn encode(
        &self,
        source: &SourceMedia,
        spec: &TransformSpec,
        output: &Path,
    ) -> MediaResult<Variant> {
        self.encode_with(self.caps.backend, source, spec, output)
            .await
    }

    async fn encode_software(
        &self,
        source: &SourceMedia,
        spec: &TransformSpec,
        output: &Path,
    ) -> MediaResult<Variant> {
        if !self.caps.software_available {
            return Err(MediaError::NoEncoderAvailable);
        }
        warn!(output = %output.display(), "Retrying encode on libx264");
        self.encode_with(EncoderBackend::Software, source, spec, output)
            .await
    }
}

/// Target video bitrate for one variant, in kbit/s.
///
/// Uses the probed stream bitrate when available, otherwise a rough
/// size-based estimate, then applies the spec's jitter factor.
fn target_bitrate_kbps(source: &SourceMedia, spec: &TransformSpec) -> u32 {
    let base = source.bitrate_kbps.unwrap_or_else(|| {
        let size_mb = source.size_bytes as f64 / (1024.0 * 1024.0);
        ((size_mb * BITRATE_PER_MB_KBPS) as u32).max(MIN_BITRATE_KBPS)
    });
    (((base as f64) * spec.bitrate_factor).round() as u32).max(1)
}

/// Assemble the full ffmpeg invocation for one variant.
fn build_encode_command(
    backend: EncoderBackend,
    source: &SourceMedia,
    spec: &TransformSpec,
    output: &Path,
    bitrate_kbps: u32,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(&source.path, output)
        // Retained container tags defeat uniqueization; drop them all
        .output_args(["-map_metadata", "-1"]);

    if let Some(vf) = build_video_filter(spec, source.width, source.height) {
        cmd = cmd.video_filter(vf);
    }

    cmd = cmd
        .video_codec(backend.encoder_name())
        .output_args(backend_args(backend, bitrate_kbps))
        .output_args(["-pix_fmt", "yuv420p", "-movflags", "+faststart"]);

    match source.sample_rate.and_then(|sr| build_audio_filter(spec, sr)) {
        Some(af) => {
            cmd = cmd.audio_filter(af).audio_codec("aac").audio_bitrate("128k");
        }
        None if source.has_audio() => {
            cmd = cmd.audio_codec("copy");
        }
        None => {
            cmd = cmd.output_arg("-an");
        }
    }

    cmd
}

/// Backend-specific rate-control arguments.
fn backend_args(backend: EncoderBackend, bitrate_kbps: u32) -> Vec<String> {
    let b = bitrate_kbps;
    match backend {
        EncoderBackend::Nvenc => vec![
            "-preset".to_string(),
            "p4".to_string(),
            "-rc".to_string(),
            "vbr".to_string(),
            "-b:v".to_string(),
            format!("{}k", b),
            "-maxrate".to_string(),
            format!("{}k", b * 3 / 2),
            "-bufsize".to_string(),
            format!("{}k", b * 2),
            "-rc-lookahead".to_string(),
            "20".to_string(),
            "-spatial-aq".to_string(),
            "1".to_string(),
            "-temporal-aq".to_string(),
            "1".to_string(),
            "-b_ref_mode".to_string(),
            "middle".to_string(),
        ],
        EncoderBackend::Qsv => vec![
            "-global_quality".to_string(),
            "23".to_string(),
            "-preset".to_string(),
            "balanced".to_string(),
        ],
        EncoderBackend::Amf => vec![
            "-quality".to_string(),
            "balanced".to_string(),
            "-rc".to_string(),
            "vbr_peak".to_string(),
            "-b:v".to_string(),
            format!("{}k", b),
        ],
        EncoderBackend::VideoToolbox => vec![
            "-b:v".to_string(),
            format!("{}k", b),
            "-allow_sw".to_string(),
            "1".to_string(),
            "-realtime".to_string(),
            "1".to_string(),
        ],
        EncoderBackend::Software => vec![
            "-b:v".to_string(),
            format!("{}k", b),
            "-crf".to_string(),
            "23".to_string(),
        ],
    }
}

/// Post-encode checks: a present, nonzero, decodable file whose duration
/// matches the speed-adjusted source, whose resolution is preserved, and
/// whose checksum differs from the source's.
async fn validate_output(
    source: &SourceMedia,
    spec: &TransformSpec,
    output: &Path,
) -> MediaResult<Variant> {
    let meta = tokio::fs::metadata(output)
        .await
        .map_err(|_| MediaError::validation_failed("output file missing"))?;
    if meta.len() == 0 {
        return Err(MediaError::validation_failed("output file is empty"));
    }

    let info = probe_media(output)
        .await
        .map_err(|e| MediaError::validation_failed(format!("output not decodable: {}", e)))?;

    let expected_duration = source.duration_secs / spec.speed_factor;
    let tolerance =
        (expected_duration * DURATION_TOLERANCE_FRACTION).max(DURATION_TOLERANCE_FLOOR_SECS);
    if (info.duration_secs - expected_duration).abs() > tolerance {
        return Err(MediaError::validation_failed(format!(
            "duration {:.2}s outside {:.2}s +/- {:.2}s",
            info.duration_secs, expected_duration, tolerance
        )));
    }

    if info.width != source.width || info.height != source.height {
        return Err(MediaError::validation_failed(format!(
            "resolution {}x{} does not match source {}x{}",
            info.width, info.height, source.width, source.height
        )));
    }

    let checksum = sha256_file(output).await?;
    if checksum == source.checksum {
        return Err(MediaError::validation_failed(
            "output checksum equals source checksum",
        ));
    }

    Ok(Variant {
        id: VariantId::new(),
        path: output.to_path_buf(),
        spec: *spec,
        size_bytes: meta.len(),
        checksum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_source(bitrate_kbps: Option<u32>, sample_rate: Option<u32>) -> SourceMedia {
        SourceMedia {
            path: PathBuf::from("/tmp/in.mp4"),
            container: "mp4".to_string(),
            duration_secs: 30.0,
            width: 1920,
            height: 1080,
            size_bytes: 10 * 1024 * 1024,
            bitrate_kbps,
            sample_rate,
            checksum: "aa".repeat(32),
        }
    }

    #[test]
    fn test_bitrate_falls_back_to_size_estimate() {
        // 10 MB source, 200 kbit/s per MB
        let spec = TransformSpec::neutral();
        assert_eq!(target_bitrate_kbps(&sample_source(None, None), &spec), 2000);
    }

    #[test]
    fn test_bitrate_estimate_has_floor() {
        let mut source = sample_source(None, None);
        source.size_bytes = 1024 * 1024;
        let spec = TransformSpec::neutral();
        assert_eq!(target_bitrate_kbps(&source, &spec), MIN_BITRATE_KBPS);
    }

    #[test]
    fn test_bitrate_jitter_applies_to_probed_rate() {
        let spec = TransformSpec {
            bitrate_factor: 1.05,
            ..TransformSpec::neutral()
        };
        assert_eq!(
            target_bitrate_kbps(&sample_source(Some(4000), None), &spec),
            4200
        );
    }

    #[test]
    fn test_nvenc_rate_control_args() {
        let args = backend_args(EncoderBackend::Nvenc, 2000);
        let joined = args.join(" ");
        assert!(joined.contains("-b:v 2000k"));
        assert!(joined.contains("-maxrate 3000k"));
        assert!(joined.contains("-bufsize 4000k"));
        assert!(joined.contains("-b_ref_mode middle"));
    }

    #[test]
    fn test_command_strips_metadata() {
        let source = sample_source(Some(4000), Some(44100));
        let spec = TransformSpec::neutral();
        let cmd = build_encode_command(
            EncoderBackend::Software,
            &source,
            &spec,
            Path::new("/tmp/out.mp4"),
            2000,
        );
        let args = cmd.build_args();
        let meta_pos = args.iter().position(|a| a == "-map_metadata").unwrap();
        assert_eq!(args[meta_pos + 1], "-1");
        assert!(args.contains(&"+faststart".to_string()));
    }

    #[test]
    fn test_neutral_audio_is_stream_copied() {
        let source = sample_source(Some(4000), Some(44100));
        let spec = TransformSpec::neutral();
        let cmd = build_encode_command(
            EncoderBackend::Software,
            &source,
            &spec,
            Path::new("/tmp/out.mp4"),
            2000,
        );
        let args = cmd.build_args();
        let ca_pos = args.iter().position(|a| a == "-c:a").unwrap();
        assert_eq!(args[ca_pos + 1], "copy");
    }

    #[test]
    fn test_pitched_audio_is_reencoded() {
        let source = sample_source(Some(4000), Some(44100));
        let spec = TransformSpec {
            audio_pitch_semitones: 0.2,
            ..TransformSpec::neutral()
        };
        let cmd = build_encode_command(
            EncoderBackend::Software,
            &source,
            &spec,
            Path::new("/tmp/out.mp4"),
            2000,
        );
        let args = cmd.build_args();
        assert!(args.contains(&"-af".to_string()));
        let ca_pos = args.iter().position(|a| a == "-c:a").unwrap();
        assert_eq!(args[ca_pos + 1], "aac");
    }

    #[test]
    fn test_silent_source_disables_audio() {
        let source = sample_source(Some(4000), None);
        let spec = TransformSpec::neutral();
        let cmd = build_encode_command(
            EncoderBackend::Software,
            &source,
            &spec,
            Path::new("/tmp/out.mp4"),
            2000,
        );
        assert!(cmd.build_args().contains(&"-an".to_string()));
    }
}
