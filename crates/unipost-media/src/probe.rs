//! FFprobe media information.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use unipost_models::SourceMedia;

use crate::error::{MediaError, MediaResult};

/// Probed container and stream information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Container format name
    pub container: String,
    /// Duration in seconds
    pub duration_secs: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Video codec
    pub video_codec: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// Video bitrate in kbit/s, when reported
    pub bitrate_kbps: Option<u32>,
    /// Audio sample rate in Hz, when an audio stream exists
    pub sample_rate: Option<u32>,
}

impl MediaInfo {
    pub fn has_audio(&self) -> bool {
        self.sample_rate.is_some()
    }

    /// Attach a content checksum to form the immutable source handle.
    pub fn into_source(self, path: impl Into<PathBuf>, checksum: String) -> SourceMedia {
        SourceMedia {
            path: path.into(),
            container: self.container,
            duration_secs: self.duration_secs,
            width: self.width,
            height: self.height,
            size_bytes: self.size_bytes,
            bitrate_kbps: self.bitrate_kbps,
            sample_rate: self.sample_rate,
            checksum,
        }
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    sample_rate: Option<String>,
    bit_rate: Option<String>,
}

/// Probe a media file for information.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    // Check FFprobe exists
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ProbeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    parse_probe(probe)
}

/// Turn raw ffprobe JSON into [`MediaInfo`]. Split out so the parsing
/// rules are unit-testable without a binary.
fn parse_probe(probe: FfprobeOutput) -> MediaResult<MediaInfo> {
    // Find video stream
    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("no video stream found".to_string()))?;
    let audio = probe.streams.iter().find(|s| s.codec_type == "audio");

    // Parse duration
    let duration_secs = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    if duration_secs <= 0.0 {
        return Err(MediaError::InvalidVideo(
            "container reports no duration".to_string(),
        ));
    }

    // Parse size
    let size_bytes = probe
        .format
        .size
        .as_ref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    // Prefer the video stream bitrate, fall back to the container figure
    let bitrate_kbps = video
        .bit_rate
        .as_ref()
        .or(probe.format.bit_rate.as_ref())
        .and_then(|b| b.parse::<u64>().ok())
        .map(|b| (b / 1000) as u32)
        .filter(|&k| k > 0);

    let sample_rate = audio
        .and_then(|a| a.sample_rate.as_ref())
        .and_then(|r| r.parse::<u32>().ok());

    // Parse frame rate
    let fps = video
        .avg_frame_rate
        .as_ref()
        .or(video.r_frame_rate.as_ref())
        .and_then(|r| parse_frame_rate(r))
        .unwrap_or(30.0);

    Ok(MediaInfo {
        container: probe.format.format_name.unwrap_or_default(),
        duration_secs,
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        fps,
        video_codec: video.codec_name.clone().unwrap_or_default(),
        size_bytes,
        bitrate_kbps,
        sample_rate,
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
    }

    fn parse_json(json: &str) -> MediaResult<MediaInfo> {
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        parse_probe(probe)
    }

    #[test]
    fn test_parse_probe_full() {
        let info = parse_json(
            r#"{
                "format": {
                    "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
                    "duration": "12.480000",
                    "size": "2048000",
                    "bit_rate": "1300000"
                },
                "streams": [
                    {
                        "codec_type": "video",
                        "codec_name": "h264",
                        "width": 1920,
                        "height": 1080,
                        "avg_frame_rate": "30000/1001",
                        "bit_rate": "1200000"
                    },
                    {
                        "codec_type": "audio",
                        "codec_name": "aac",
                        "sample_rate": "44100"
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert!((info.duration_secs - 12.48).abs() < 0.001);
        assert_eq!(info.bitrate_kbps, Some(1200));
        assert_eq!(info.sample_rate, Some(44100));
        assert!(info.has_audio());
    }

    #[test]
    fn test_parse_probe_without_audio() {
        let info = parse_json(
            r#"{
                "format": {"format_name": "mp4", "duration": "5.0", "size": "1000"},
                "streams": [
                    {"codec_type": "video", "codec_name": "h264", "width": 640, "height": 360, "r_frame_rate": "30/1"}
                ]
            }"#,
        )
        .unwrap();

        assert!(!info.has_audio());
        assert_eq!(info.bitrate_kbps, None);
    }

    #[test]
    fn test_parse_probe_rejects_missing_video_stream() {
        let result = parse_json(
            r#"{
                "format": {"duration": "5.0"},
                "streams": [{"codec_type": "audio", "sample_rate": "48000"}]
            }"#,
        );
        assert!(matches!(result, Err(MediaError::InvalidVideo(_))));
    }

    #[test]
    fn test_parse_probe_rejects_zero_duration() {
        let result = parse_json(
            r#"{
                "format": {"duration": "0.0"},
                "streams": [{"codec_type": "video", "width": 100, "height": 100}]
            }"#,
        );
        assert!(matches!(result, Err(MediaError::InvalidVideo(_))));
    }
}
