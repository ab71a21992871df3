//! Detection flow
//!
//! validate → remote inference (bounded) → local fallback on call failure →
//! recommendation fetch. Steps run strictly in sequence; only one attempt may
//! be in flight per orchestrator.
//!
//! Outcome rules:
//! - Remote success → result with clamped confidence.
//! - Remote call failure (network, non-2xx, unsupported label, not
//!   configured) → local fallback.
//! - Remote call exceeding the budget → [`DetectionError::TimedOut`]; the
//!   fallback does not run.

use super::fallback;
use super::upload::{ImageUpload, ValidationError};
use super::{DetectionResult, DetectionSource};
use crate::busy::BusyGuard;
use crate::error::ServiceError;
use crate::recommendation::{Recommendations, Recommender, DETECTION_MIN_TRACKS};
use crate::services::fer_client::{FerResponse, FerService};
use moodtune_common::config::DEFAULT_DETECTION_TIMEOUT_MS;
use moodtune_common::Emotion;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const DEFAULT_REMOTE_CONFIDENCE: f64 = 0.9;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Consent is required before analyzing a photo")]
    ConsentRequired,

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("A detection is already in progress")]
    Busy,

    #[error("Detection exceeded {}, please retry", budget_label(.budget_ms))]
    TimedOut { budget_ms: u64 },

    #[error("Detection failed: {remote}; local fallback failed: {fallback}")]
    Failed { remote: String, fallback: String },
}

/// Whole seconds as `5s`, anything else in milliseconds
fn budget_label(budget_ms: &u64) -> String {
    if *budget_ms >= 1000 && budget_ms % 1000 == 0 {
        format!("{}s", budget_ms / 1000)
    } else {
        format!("{}ms", budget_ms)
    }
}

/// Result of the remote step
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    Detected(DetectionResult),
    TimedOut,
    Failed(String),
}

/// Dependent recommendation fetch; its failure does not undo the detection
#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationState {
    Loaded(Recommendations),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionReport {
    pub result: DetectionResult,
    pub latency_ms: u64,
    /// Set when the remote step failed and the fallback answered
    pub remote_error: Option<String>,
    pub recommendations: RecommendationState,
}

/// Missing or zero confidence means the classifier did not report one
pub fn normalize_confidence(raw: Option<f64>) -> f64 {
    let value = match raw {
        Some(c) if c.is_finite() && c > 0.0 => c,
        _ => DEFAULT_REMOTE_CONFIDENCE,
    };
    value.clamp(0.5, 0.99)
}

/// Turn a classifier reply into a result, rejecting unknown labels
pub fn interpret_remote(response: FerResponse, latency_ms: u64) -> Result<DetectionResult, String> {
    let emotion = Emotion::from_label(&response.emotion)
        .ok_or_else(|| format!("unsupported emotion label '{}'", response.emotion))?;
    let model_version = response
        .model_version
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| format!("remote-{}ms", latency_ms));

    Ok(DetectionResult {
        emotion,
        confidence: normalize_confidence(response.confidence),
        model_version: Some(model_version),
        source: DetectionSource::Remote,
    })
}

pub struct DetectionOrchestrator {
    fer: Arc<dyn FerService>,
    recommender: Recommender,
    budget: Duration,
    busy: AtomicBool,
}

impl DetectionOrchestrator {
    pub fn new(fer: Arc<dyn FerService>, recommender: Recommender) -> Self {
        Self {
            fer,
            recommender,
            budget: Duration::from_millis(DEFAULT_DETECTION_TIMEOUT_MS),
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn is_detecting(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Run one detection attempt; never retried automatically
    pub async fn detect(
        &self,
        image: &ImageUpload,
        consent: bool,
    ) -> Result<DetectionReport, DetectionError> {
        if !consent {
            return Err(DetectionError::ConsentRequired);
        }
        image.validate()?;

        let _guard = BusyGuard::acquire(&self.busy).ok_or(DetectionError::Busy)?;
        let started = Instant::now();

        let (result, remote_error) = match self.remote(image, started).await {
            RemoteOutcome::Detected(result) => (result, None),
            RemoteOutcome::TimedOut => {
                warn!(budget_ms = self.budget.as_millis() as u64, "Remote detection timed out");
                return Err(DetectionError::TimedOut {
                    budget_ms: self.budget.as_millis() as u64,
                });
            }
            RemoteOutcome::Failed(reason) => {
                warn!("Remote detection failed, using local fallback: {}", reason);
                match fallback::analyze(image.bytes.clone()).await {
                    Ok(result) => (result, Some(reason)),
                    Err(e) => {
                        return Err(DetectionError::Failed {
                            remote: reason,
                            fallback: e.to_string(),
                        })
                    }
                }
            }
        };
        let latency_ms = started.elapsed().as_millis() as u64;

        info!(
            emotion = %result.emotion,
            confidence = result.confidence,
            source = ?result.source,
            latency_ms,
            "Emotion detected"
        );

        let mood = result.emotion.mood_key();
        let recommendations = match self.recommender.search(mood, DETECTION_MIN_TRACKS).await {
            Ok(recs) => RecommendationState::Loaded(recs),
            Err(e) => {
                warn!(mood = %mood, "Recommendation fetch failed: {}", e);
                RecommendationState::Failed(e.to_string())
            }
        };

        Ok(DetectionReport {
            result,
            latency_ms,
            remote_error,
            recommendations,
        })
    }

    /// Remote step, classified into a typed outcome
    pub async fn remote(&self, image: &ImageUpload, started: Instant) -> RemoteOutcome {
        if !self.fer.is_configured() {
            return RemoteOutcome::Failed(ServiceError::NotConfigured("FER").to_string());
        }

        let cancel = CancellationToken::new();
        let call = self.fer.infer(image, cancel.clone());
        tokio::pin!(call);

        let reply = tokio::select! {
            reply = &mut call => reply,
            _ = tokio::time::sleep(self.budget) => {
                // Abort the in-flight request and let it unwind
                cancel.cancel();
                let _ = call.await;
                return RemoteOutcome::TimedOut;
            }
        };

        match reply {
            Err(ServiceError::Aborted) => RemoteOutcome::TimedOut,
            Err(e) => RemoteOutcome::Failed(e.to_string()),
            Ok(response) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                match interpret_remote(response, latency_ms) {
                    Ok(result) => RemoteOutcome::Detected(result),
                    Err(reason) => RemoteOutcome::Failed(reason),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(emotion: &str, confidence: Option<f64>, model: Option<&str>) -> FerResponse {
        FerResponse {
            emotion: emotion.to_string(),
            confidence,
            model_version: model.map(str::to_string),
        }
    }

    #[test]
    fn test_confidence_normalization() {
        assert_eq!(normalize_confidence(None), 0.9);
        assert_eq!(normalize_confidence(Some(0.0)), 0.9);
        assert_eq!(normalize_confidence(Some(0.2)), 0.5);
        assert_eq!(normalize_confidence(Some(1.0)), 0.99);
        assert_eq!(normalize_confidence(Some(0.73)), 0.73);
        assert_eq!(normalize_confidence(Some(f64::NAN)), 0.9);
    }

    #[test]
    fn test_interpret_remote_labels() {
        let result = interpret_remote(reply("JOY", Some(0.8), Some("fer-v3")), 120).unwrap();
        assert_eq!(result.emotion, Emotion::Joy);
        assert_eq!(result.model_version.as_deref(), Some("fer-v3"));
        assert_eq!(result.source, DetectionSource::Remote);

        let err = interpret_remote(reply("surprise", None, None), 120).unwrap_err();
        assert!(err.contains("surprise"));
    }

    #[test]
    fn test_missing_model_version_records_latency() {
        let result = interpret_remote(reply("anger", None, None), 431).unwrap();
        assert_eq!(result.model_version.as_deref(), Some("remote-431ms"));
    }

    #[test]
    fn test_timeout_message_mentions_budget() {
        let err = DetectionError::TimedOut { budget_ms: 5000 };
        assert_eq!(err.to_string(), "Detection exceeded 5s, please retry");

        let err = DetectionError::TimedOut { budget_ms: 500 };
        assert_eq!(err.to_string(), "Detection exceeded 500ms, please retry");

        let err = DetectionError::TimedOut { budget_ms: 1500 };
        assert_eq!(err.to_string(), "Detection exceeded 1500ms, please retry");
    }
}
