//! FFmpeg filter construction for uniqueizing transforms.
//!
//! Geometry filters run first and a final scale restores the exact
//! source dimensions, so every variant keeps the source resolution.

use unipost_models::TransformSpec;

const EPS: f64 = 1e-9;

fn is_zero(v: f64) -> bool {
    v.abs() < EPS
}

fn is_one(v: f64) -> bool {
    (v - 1.0).abs() < EPS
}

/// Build the video filter chain for a spec.
///
/// Returns `None` when the spec leaves the video untouched.
pub fn build_video_filter(spec: &TransformSpec, width: u32, height: u32) -> Option<String> {
    let mut chain: Vec<String> = Vec::new();
    let mut geometry_touched = false;

    if spec.crop_px > 0 {
        let c = spec.crop_px;
        chain.push(format!("crop=iw-{}:ih-{}:{}:{}", 2 * c, 2 * c, c, c));
        geometry_touched = true;
    }

    if !is_zero(spec.scale_delta) {
        // trunc(../2)*2 keeps both axes even for yuv420p
        let f = 1.0 + spec.scale_delta;
        chain.push(format!(
            "scale=trunc(iw*{:.6}/2)*2:trunc(ih*{:.6}/2)*2",
            f, f
        ));
        geometry_touched = true;
    }

    if geometry_touched {
        chain.push(format!("scale={}:{},setsar=1", width, height));
    }

    if !is_zero(spec.hue_shift_deg) {
        chain.push(format!("hue=h={:.3}", spec.hue_shift_deg));
    }

    if spec.noise_level > 0.0 {
        chain.push(format!("noise=alls={:.3}:allf=t+u", spec.noise_level));
    }

    if !is_zero(spec.brightness_delta)
        || !is_one(spec.contrast_factor)
        || !is_one(spec.saturation_factor)
        || !is_one(spec.gamma_factor)
    {
        chain.push(format!(
            "eq=brightness={:.4}:contrast={:.4}:saturation={:.4}:gamma={:.4}",
            spec.brightness_delta,
            spec.contrast_factor,
            spec.saturation_factor,
            spec.gamma_factor
        ));
    }

    if !is_one(spec.speed_factor) {
        chain.push(format!("setpts=PTS/{:.6}", spec.speed_factor));
    }

    if chain.is_empty() {
        None
    } else {
        Some(chain.join(","))
    }
}

/// Build the audio filter chain for a spec.
///
/// Pitch shifting uses the resample trick: `asetrate` shifts pitch and
/// tempo together, then `atempo` corrects the tempo so the net speed
/// matches the video's `setpts` change. Returns `None` when the audio
/// chain is neutral, which permits stream copy.
pub fn build_audio_filter(spec: &TransformSpec, sample_rate: u32) -> Option<String> {
    let pitch_ratio = (spec.audio_pitch_semitones / 12.0).exp2();
    let tempo = spec.speed_factor / pitch_ratio;

    if is_one(pitch_ratio) && is_one(spec.speed_factor) {
        return None;
    }

    if is_one(pitch_ratio) {
        return Some(format!("atempo={:.6}", tempo));
    }

    Some(format!(
        "asetrate={}*{:.6},aresample={},atempo={:.6}",
        sample_rate, pitch_ratio, sample_rate, tempo
    ))
}
