//! Transformation parameters and their configured bounds.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Inclusive floating-point parameter range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// A range collapsed to a single point. The selector still succeeds
    /// on these; the knob just has zero variance.
    pub const fn fixed(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Inclusive integer parameter range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IntBounds {
    pub min: u32,
    pub max: u32,
}

impl IntBounds {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Concrete transformation parameters for one variant.
///
/// Drawn by the selector, immutable afterwards. Every field is bounded by
/// a [`TransformBounds`] range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransformSpec {
    /// Pixels cropped from each edge, restored by rescaling afterwards
    pub crop_px: u32,

    /// Relative resample jitter (both axes scale by 1.0 + delta)
    pub scale_delta: f64,

    /// Hue rotation in degrees
    pub hue_shift_deg: f64,

    /// Film-grain noise strength
    pub noise_level: f64,

    /// Playback speed multiplier
    pub speed_factor: f64,

    /// Audio pitch shift in semitones
    pub audio_pitch_semitones: f64,

    /// Brightness offset
    pub brightness_delta: f64,

    /// Contrast multiplier
    pub contrast_factor: f64,

    /// Saturation multiplier
    pub saturation_factor: f64,

    /// Gamma multiplier
    pub gamma_factor: f64,

    /// Multiplier over the source bitrate estimate
    pub bitrate_factor: f64,
}

impl TransformSpec {
    /// Identity spec: no visible change, useful as a test baseline.
    pub fn neutral() -> Self {
        Self {
            crop_px: 0,
            scale_delta: 0.0,
            hue_shift_deg: 0.0,
            noise_level: 0.0,
            speed_factor: 1.0,
            audio_pitch_semitones: 0.0,
            brightness_delta: 0.0,
            contrast_factor: 1.0,
            saturation_factor: 1.0,
            gamma_factor: 1.0,
            bitrate_factor: 1.0,
        }
    }
}

/// Configured safe range for every transformation knob.
///
/// Bounds are configuration, not code: the whole set can be replaced via
/// a JSON override. Defaults keep each knob below the perceptual
/// threshold while still flipping enough bits to change the content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TransformBounds {
    pub crop_px: IntBounds,
    pub scale_delta: Bounds,
    pub hue_shift_deg: Bounds,
    pub noise_level: Bounds,
    pub speed_factor: Bounds,
    pub audio_pitch_semitones: Bounds,
    pub brightness_delta: Bounds,
    pub contrast_factor: Bounds,
    pub saturation_factor: Bounds,
    pub gamma_factor: Bounds,
    pub bitrate_factor: Bounds,
}

impl Default for TransformBounds {
    fn default() -> Self {
        Self {
            crop_px: IntBounds::new(0, 6),
            scale_delta: Bounds::new(-0.02, 0.02),
            hue_shift_deg: Bounds::new(-5.0, 5.0),
            noise_level: Bounds::new(0.3, 0.8),
            speed_factor: Bounds::new(0.98, 1.02),
            audio_pitch_semitones: Bounds::new(-0.3, 0.3),
            brightness_delta: Bounds::new(-0.03, 0.03),
            contrast_factor: Bounds::new(0.98, 1.02),
            saturation_factor: Bounds::new(0.98, 1.02),
            gamma_factor: Bounds::new(0.98, 1.02),
            bitrate_factor: Bounds::new(0.95, 1.05),
        }
    }
}

impl TransformBounds {
    fn float_knobs(&self) -> [(&'static str, Bounds); 10] {
        [
            ("scale_delta", self.scale_delta),
            ("hue_shift_deg", self.hue_shift_deg),
            ("noise_level", self.noise_level),
            ("speed_factor", self.speed_factor),
            ("audio_pitch_semitones", self.audio_pitch_semitones),
            ("brightness_delta", self.brightness_delta),
            ("contrast_factor", self.contrast_factor),
            ("saturation_factor", self.saturation_factor),
            ("gamma_factor", self.gamma_factor),
            ("bitrate_factor", self.bitrate_factor),
        ]
    }

    /// Check every range is ordered (min <= max).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.crop_px.min > self.crop_px.max {
            return Err(ValidationError::InvalidBounds {
                knob: "crop_px",
                min: self.crop_px.min as f64,
                max: self.crop_px.max as f64,
            });
        }
        for (knob, bounds) in self.float_knobs() {
            if bounds.min > bounds.max {
                return Err(ValidationError::InvalidBounds {
                    knob,
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }
        Ok(())
    }

    /// Check a drawn spec still sits inside these bounds.
    ///
    /// Re-run immediately before encoding as a guard against bound
    /// configuration drifting between selection and invocation.
    pub fn check(&self, spec: &TransformSpec) -> Result<(), ValidationError> {
        if !self.crop_px.contains(spec.crop_px) {
            return Err(ValidationError::OutOfBounds {
                knob: "crop_px",
                value: spec.crop_px as f64,
                min: self.crop_px.min as f64,
                max: self.crop_px.max as f64,
            });
        }
        let values = [
            spec.scale_delta,
            spec.hue_shift_deg,
            spec.noise_level,
            spec.speed_factor,
            spec.audio_pitch_semitones,
            spec.brightness_delta,
            spec.contrast_factor,
            spec.saturation_factor,
            spec.gamma_factor,
            spec.bitrate_factor,
        ];
        for ((knob, bounds), value) in self.float_knobs().into_iter().zip(values) {
            if !bounds.contains(value) {
                return Err(ValidationError::OutOfBounds {
                    knob,
                    value,
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }
        Ok(())
    }
}
