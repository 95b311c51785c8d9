#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for video uniqueization.
//!
//! This crate provides:
//! - One-per-process encoder capability probing with hardware preference
//! - Type-safe FFmpeg command building with timeout and cancellation
//! - Deterministic transform selection within configured bounds
//! - Variant encoding with metadata stripping and post-encode validation

pub mod backend;
pub mod command;
pub mod encode;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod metrics;
pub mod probe;
pub mod selector;

pub use backend::{from_encoder_listing, EncoderBackend, EncoderCapabilities};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use encode::{EncodeOptions, VariantEncode, VariantEncoder};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_media, MediaInfo};
pub use selector::TransformSelector;
