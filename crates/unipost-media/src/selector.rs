//! Deterministic transform selection.
//!
//! Each spec is drawn uniformly within configured bounds from an RNG
//! seeded by SHA-256 over the batch seed and the per-account salt. The
//! same (seed, salt) pair always yields the same spec; different salts
//! diverge before any parameter is drawn.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use unipost_models::{Bounds, IntBounds, TransformBounds, TransformSpec};

/// Draws bounded transform specs for accounts.
#[derive(Debug, Clone)]
pub struct TransformSelector {
    bounds: TransformBounds,
}

impl TransformSelector {
    pub fn new(bounds: TransformBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &TransformBounds {
        &self.bounds
    }

    /// Draw a spec for one account.
    ///
    /// Pure and total: identical inputs always produce identical specs,
    /// and a knob whose range is a single point simply has zero variance.
    pub fn select(&self, seed: u64, account_salt: &str) -> TransformSpec {
        let mut rng = StdRng::seed_from_u64(derive_rng_seed(seed, account_salt));

        // Field order is fixed. Reordering would silently remap every
        // drawn spec for existing seeds.
        TransformSpec {
            crop_px: draw_int(&mut rng, self.bounds.crop_px),
            scale_delta: draw(&mut rng, self.bounds.scale_delta),
            hue_shift_deg: draw(&mut rng, self.bounds.hue_shift_deg),
            noise_level: draw(&mut rng, self.bounds.noise_level),
            speed_factor: draw(&mut rng, self.bounds.speed_factor),
            audio_pitch_semitones: draw(&mut rng, self.bounds.audio_pitch_semitones),
            brightness_delta: draw(&mut rng, self.bounds.brightness_delta),
            contrast_factor: draw(&mut rng, self.bounds.contrast_factor),
            saturation_factor: draw(&mut rng, self.bounds.saturation_factor),
            gamma_factor: draw(&mut rng, self.bounds.gamma_factor),
            bitrate_factor: draw(&mut rng, self.bounds.bitrate_factor),
        }
    }
}

/// Fold (seed, salt) into a 64-bit RNG seed.
fn derive_rng_seed(seed: u64, salt: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_be_bytes());
    hasher.update(salt.as_bytes());
    let digest = hasher.finalize();
    let mut first8 = [0u8; 8];
    first8.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(first8)
}

fn draw(rng: &mut StdRng, bounds: Bounds) -> f64 {
    if bounds.min >= bounds.max {
        return bounds.min;
    }
    rng.random_range(bounds.min..=bounds.max)
}

fn draw_int(rng: &mut StdRng, bounds: IntBounds) -> u32 {
    if bounds.min >= bounds.max {
        return bounds.min;
    }
    rng.random_range(bounds.min..=bounds.max)
}
