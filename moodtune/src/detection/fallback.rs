//! Local brightness heuristic
//!
//! Used when the remote classifier call fails. The image is downscaled so its
//! longest side is at most [`MAX_SIDE`] pixels, then the mean Rec. 709 luma is
//! mapped onto joy/sadness/anger by fixed thresholds.

use super::{DetectionResult, DetectionSource};
use image::imageops::FilterType;
use image::DynamicImage;
use moodtune_common::Emotion;
use thiserror::Error;

pub const MODEL_VERSION: &str = "local-fallback-0.1";
pub const MAX_SIDE: u32 = 256;
pub const JOY_THRESHOLD: f64 = 0.66;
pub const SADNESS_THRESHOLD: f64 = 0.33;

const LUMA_R: f64 = 0.2126;
const LUMA_G: f64 = 0.7152;
const LUMA_B: f64 = 0.0722;

#[derive(Debug, Clone, Error)]
pub enum FallbackError {
    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Image has no pixels")]
    Empty,

    #[error("Fallback task failed: {0}")]
    Task(String),
}

/// Shrink so the longest side is at most `MAX_SIDE`; smaller images are kept
fn downscale(img: DynamicImage) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    if w.max(h) <= MAX_SIDE {
        return img;
    }
    let scale = MAX_SIDE as f64 / w.max(h) as f64;
    let nw = ((w as f64 * scale).round() as u32).max(1);
    let nh = ((h as f64 * scale).round() as u32).max(1);
    img.resize_exact(nw, nh, FilterType::Triangle)
}

/// Mean luma in [0, 1]
pub fn mean_luma(img: &DynamicImage) -> Option<f64> {
    let rgb = img.to_rgb8();
    let count = rgb.width() as u64 * rgb.height() as u64;
    if count == 0 {
        return None;
    }
    let sum: f64 = rgb
        .pixels()
        .map(|p| LUMA_R * p[0] as f64 + LUMA_G * p[1] as f64 + LUMA_B * p[2] as f64)
        .sum();
    Some((sum / count as f64 / 255.0).clamp(0.0, 1.0))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Map mean luma to an emotion and a confidence in [0.5, 0.99]
pub fn classify_brightness(mean: f64) -> (Emotion, f64) {
    let mean = mean.clamp(0.0, 1.0);
    let (emotion, raw) = if mean >= JOY_THRESHOLD {
        (Emotion::Joy, 0.85 + (mean - JOY_THRESHOLD) * 0.15)
    } else if mean <= SADNESS_THRESHOLD {
        (Emotion::Sadness, 0.85 + (SADNESS_THRESHOLD - mean) * 0.15)
    } else {
        (Emotion::Anger, 0.75 + (0.5 - (0.5 - mean).abs()) * 0.25)
    };
    (emotion, round2(raw).clamp(0.5, 0.99))
}

/// Decode and classify (CPU-bound; call from a blocking thread)
pub fn analyze_bytes(bytes: &[u8]) -> Result<DetectionResult, FallbackError> {
    let img = image::load_from_memory(bytes).map_err(|e| FallbackError::Decode(e.to_string()))?;
    let small = downscale(img);
    let mean = mean_luma(&small).ok_or(FallbackError::Empty)?;
    let (emotion, confidence) = classify_brightness(mean);

    tracing::debug!(mean_luma = mean, emotion = %emotion, "Brightness fallback classified");

    Ok(DetectionResult {
        emotion,
        confidence,
        model_version: Some(MODEL_VERSION.to_string()),
        source: DetectionSource::LocalFallback,
    })
}

/// Run the heuristic on the blocking pool
pub async fn analyze(bytes: Vec<u8>) -> Result<DetectionResult, FallbackError> {
    tokio::task::spawn_blocking(move || analyze_bytes(&bytes))
        .await
        .map_err(|e| FallbackError::Task(e.to_string()))?
}
