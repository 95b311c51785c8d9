//! Media handles: probed source files and encoded variants.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::transform::TransformSpec;

/// Immutable handle to a probed source file.
///
/// Created once per batch by probing the upload; read-only afterwards and
/// safely shared by every encode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceMedia {
    /// Local filesystem path
    pub path: PathBuf,

    /// Container format reported by the probe
    pub container: String,

    /// Duration in seconds
    pub duration_secs: f64,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// File size in bytes
    pub size_bytes: u64,

    /// Video bitrate in kbit/s, when the container reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,

    /// Audio sample rate in Hz, when an audio stream exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,

    /// SHA-256 of the file contents, hex-encoded
    pub checksum: String,
}

impl SourceMedia {
    pub fn has_audio(&self) -> bool {
        self.sample_rate.is_some()
    }
}

/// Unique identifier for a produced variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VariantId(pub String);

impl VariantId {
    /// Generate a new random variant ID.
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

impl Default for VariantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One uniquely-encoded rendition of the source.
///
/// Consumed by exactly one publish job; no two accounts ever receive the
/// same variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Variant {
    pub id: VariantId,

    /// Local path of the encoded file
    pub path: PathBuf,

    /// Parameters that produced it
    pub spec: TransformSpec,

    /// Encoded file size in bytes
    pub size_bytes: u64,

    /// SHA-256 of the encoded file, hex-encoded. Always distinct from the
    /// source checksum and from every other variant in the batch.
    pub checksum: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_id_roundtrip() {
        let id = VariantId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: VariantId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_source_media_audio_flag() {
        let media = SourceMedia {
            path: PathBuf::from("/tmp/in.mp4"),
            container: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
            duration_secs: 12.5,
            width: 1920,
            height: 1080,
            size_bytes: 1_000_000,
            bitrate_kbps: Some(4200),
            sample_rate: None,
            checksum: "abc".to_string(),
        };
        assert!(!media.has_audio());
    }
}
