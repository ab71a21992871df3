//! Inference record persistence
//!
//! The stored emotion follows the intention: `maintain` keeps the detected
//! emotion, `change` stores the user-chosen target.

use super::DetectionResult;
use crate::auth::SessionStore;
use crate::error::ServiceError;
use crate::services::api_client::BackendApi;
use moodtune_common::models::{Inference, InferenceCreate};
use moodtune_common::{Emotion, Intention};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Log in to save")]
    NotAuthenticated,

    #[error("Detect an emotion first")]
    NoResult,

    #[error("Choose a target emotion to change to")]
    MissingTarget,

    #[error("Could not save inference: {0}")]
    Service(#[from] ServiceError),
}

/// Emotion to store for the given intention
pub fn emotion_for_intention(
    detected: Emotion,
    intention: Intention,
    target: Option<Emotion>,
) -> Result<Emotion, PersistError> {
    match intention {
        Intention::Maintain => Ok(detected),
        Intention::Change => target.ok_or(PersistError::MissingTarget),
    }
}

pub async fn save_inference(
    api: &dyn BackendApi,
    session: &SessionStore,
    result: Option<&DetectionResult>,
    latency_ms: Option<u64>,
    intention: Intention,
    target: Option<Emotion>,
) -> Result<Inference, PersistError> {
    let session_id = session.session_id().ok_or(PersistError::NotAuthenticated)?;
    let result = result.ok_or(PersistError::NoResult)?;
    let emotion = emotion_for_intention(result.emotion, intention, target)?;

    let body = InferenceCreate {
        session_id,
        emotion,
        confidence: result.confidence,
        intention: Some(intention),
        latency_ms,
        model_version: result.model_version.clone(),
    };
    let inference = api.create_inference(&body).await?;
    info!(
        inference_id = %inference.inference_id,
        emotion = %emotion,
        intention = %intention,
        "Inference saved"
    );
    Ok(inference)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maintain_keeps_detected_emotion() {
        let e = emotion_for_intention(Emotion::Sadness, Intention::Maintain, Some(Emotion::Joy));
        assert_eq!(e.unwrap(), Emotion::Sadness);
    }

    #[test]
    fn test_change_uses_target() {
        let e = emotion_for_intention(Emotion::Sadness, Intention::Change, Some(Emotion::Joy));
        assert_eq!(e.unwrap(), Emotion::Joy);

        let missing = emotion_for_intention(Emotion::Sadness, Intention::Change, None);
        assert!(matches!(missing, Err(PersistError::MissingTarget)));
    }
}
