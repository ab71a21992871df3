//! Mood-based track recommendations
//!
//! Every call re-fetches; nothing is cached. The requested minimum is clamped
//! into the bounds of the calling flow.

use crate::error::ServiceError;
use crate::services::rag_client::{PlaylistSuggestion, RecommendationService};
use crate::tracks::Track;
use moodtune_common::MoodKey;
use std::ops::RangeInclusive;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Bounds for free exploration and post-detection search
pub const SEARCH_MIN_BOUNDS: RangeInclusive<u32> = 5..=60;
/// Bounds for playlist suggestions
pub const PLAYLIST_MIN_BOUNDS: RangeInclusive<u32> = 5..=50;
/// Minimum requested right after a detection
pub const DETECTION_MIN_TRACKS: u32 = 20;

#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("Could not load recommendations: {0}")]
    Service(#[from] ServiceError),
}

/// Tracks for one mood plus an optional advisory note
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendations {
    pub mood: MoodKey,
    pub requested_min: u32,
    pub tracks: Vec<Track>,
    pub note: Option<String>,
}

pub fn clamp_min(value: u32, bounds: &RangeInclusive<u32>) -> u32 {
    value.clamp(*bounds.start(), *bounds.end())
}

/// Service note, or a synthesized one when fewer tracks came back
pub fn advisory_note(service_note: Option<String>, requested: u32, returned: usize) -> Option<String> {
    if service_note.is_some() {
        return service_note;
    }
    if (returned as u32) < requested {
        return Some(format!(
            "Only {} of {} requested tracks were found.",
            returned, requested
        ));
    }
    None
}

#[derive(Clone)]
pub struct Recommender {
    rag: Arc<dyn RecommendationService>,
}

impl Recommender {
    pub fn new(rag: Arc<dyn RecommendationService>) -> Self {
        Self { rag }
    }

    pub async fn search(
        &self,
        mood: MoodKey,
        min_tracks: u32,
    ) -> Result<Recommendations, RecommendationError> {
        let requested = clamp_min(min_tracks, &SEARCH_MIN_BOUNDS);
        if requested != min_tracks {
            debug!(min_tracks, requested, "Clamped recommendation minimum");
        }

        let result = self.rag.search(mood, requested).await?;
        let note = advisory_note(result.note, requested, result.tracks.len());
        info!(mood = %mood, returned = result.tracks.len(), "Recommendations loaded");

        Ok(Recommendations {
            mood,
            requested_min: requested,
            tracks: result.tracks,
            note,
        })
    }

    pub async fn suggest_playlist(
        &self,
        mood: MoodKey,
        min_tracks: u32,
    ) -> Result<PlaylistSuggestion, RecommendationError> {
        let requested = clamp_min(min_tracks, &PLAYLIST_MIN_BOUNDS);
        let mut suggestion = self.rag.playlist(mood, requested).await?;
        suggestion.note = advisory_note(suggestion.note.take(), requested, suggestion.tracks.len());
        info!(mood = %mood, returned = suggestion.tracks.len(), "Playlist suggestion loaded");
        Ok(suggestion)
    }
}
