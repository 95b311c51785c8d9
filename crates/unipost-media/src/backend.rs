//! Encoder backend detection.
//!
//! The local ffmpeg build is probed once per process for usable H.264
//! encoders, in fixed hardware preference order, with libx264 as the
//! software fallback when permitted.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{MediaError, MediaResult};

/// Seconds allowed for the `-encoders` listing before giving up.
const PROBE_TIMEOUT_SECS: u64 = 5;

/// Hardware preference order for the capability probe.
const HARDWARE_BACKENDS: [EncoderBackend; 4] = [
    EncoderBackend::Nvenc,
    EncoderBackend::Qsv,
    EncoderBackend::Amf,
    EncoderBackend::VideoToolbox,
];

/// An H.264 encoder implementation ffmpeg may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderBackend {
    Nvenc,
    Qsv,
    Amf,
    VideoToolbox,
    Software,
}

impl EncoderBackend {
    /// ffmpeg encoder name, as passed to `-c:v`.
    pub fn encoder_name(&self) -> &'static str {
        match self {
            EncoderBackend::Nvenc => "h264_nvenc",
            EncoderBackend::Qsv => "h264_qsv",
            EncoderBackend::Amf => "h264_amf",
            EncoderBackend::VideoToolbox => "h264_videotoolbox",
            EncoderBackend::Software => "libx264",
        }
    }

    pub fn is_hardware(&self) -> bool {
        !matches!(self, EncoderBackend::Software)
    }
}

impl fmt::Display for EncoderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encoder_name())
    }
}

/// Outcome of the capability probe.
///
/// Owned explicitly by the caller and handed to the encoder at
/// construction; there is no process-global backend flag.
#[derive(Debug, Clone, Copy)]
pub struct EncoderCapabilities {
    /// Backend for primary encode attempts
    pub backend: EncoderBackend,
    /// Whether libx264 may serve as a fallback after hardware failures
    pub software_available: bool,
}

impl EncoderCapabilities {
    /// Probe the local ffmpeg for usable H.264 encoders.
    ///
    /// `allow_software` admits libx264 both as the fallback after a
    /// hardware failure and as the primary backend when no hardware
    /// encoder is present. With it off, a machine without hardware
    /// encoders fails here instead of silently encoding 50x slower.
    pub async fn detect(allow_software: bool) -> MediaResult<Self> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let probe = Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output();

        let output = tokio::time::timeout(Duration::from_secs(PROBE_TIMEOUT_SECS), probe)
            .await
            .map_err(|_| MediaError::Timeout(PROBE_TIMEOUT_SECS))??;

        if !output.status.success() {
            warn!("ffmpeg -encoders exited with non-zero status");
            return Err(MediaError::NoEncoderAvailable);
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        match from_encoder_listing(&listing, allow_software) {
            Some(caps) => {
                info!(
                    backend = caps.backend.encoder_name(),
                    software_fallback = caps.software_available,
                    "Encoder backend selected"
                );
                Ok(caps)
            }
            None => {
                warn!("No usable H.264 encoder in this ffmpeg build");
                Err(MediaError::NoEncoderAvailable)
            }
        }
    }
}

/// Pick a backend from an `ffmpeg -encoders` listing.
pub fn from_encoder_listing(listing: &str, allow_software: bool) -> Option<EncoderCapabilities> {
    let software_available = allow_software && listing.contains("libx264");
    for backend in HARDWARE_BACKENDS {
        if listing.contains(backend.encoder_name()) {
            return Some(EncoderCapabilities {
                backend,
                software_available,
            });
        }
    }
    software_available.then_some(EncoderCapabilities {
        backend: EncoderBackend::Software,
        software_available,
    })
}
