//! Emotion detection
//!
//! Remote-first classification with a local brightness fallback, bounded by a
//! wall-clock budget, followed by a recommendation fetch for the mapped mood.

pub mod fallback;
pub mod orchestrator;
pub mod persist;
pub mod upload;

pub use orchestrator::{
    DetectionError, DetectionOrchestrator, DetectionReport, RecommendationState, RemoteOutcome,
};
pub use persist::{save_inference, PersistError};
pub use upload::{ImageUpload, ValidationError, MAX_IMAGE_BYTES};

use moodtune_common::Emotion;
use serde::Serialize;

/// Which path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    Remote,
    LocalFallback,
}

/// Classified emotion; replaced wholesale by each new attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub emotion: Emotion,
    /// In [0.5, 0.99]
    pub confidence: f64,
    pub model_version: Option<String>,
    pub source: DetectionSource,
}
