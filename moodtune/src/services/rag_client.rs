//! Recommendation (RAG) service client
//!
//! Raw tracks are normalized into [`Track`] here so nothing downstream sees
//! the alias cover fields.

use crate::error::ServiceResult;
use crate::services::http::{build_http_client, join_url, read_json};
use crate::tracks::{RawTrack, Track};
use async_trait::async_trait;
use moodtune_common::MoodKey;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
struct RagRequest {
    emotion: MoodKey,
    min_tracks: u32,
}

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    #[serde(default)]
    emotion: Option<String>,
    #[serde(default)]
    requested_min: Option<u32>,
    #[serde(default)]
    returned: Option<u32>,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    items: Vec<RawTrack>,
}

#[derive(Debug, Deserialize)]
struct RawPlaylistResponse {
    #[serde(default)]
    emotion: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    returned: Option<u32>,
    #[serde(default)]
    items: Vec<RawTrack>,
    #[serde(default)]
    uris: Vec<String>,
    #[serde(default)]
    note: Option<String>,
}

/// Search results
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub emotion: String,
    pub requested_min: u32,
    pub returned: u32,
    pub note: Option<String>,
    pub tracks: Vec<Track>,
}

/// Suggested playlist with title/description
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistSuggestion {
    pub emotion: String,
    pub title: String,
    pub description: String,
    pub returned: u32,
    pub tracks: Vec<Track>,
    pub uris: Vec<String>,
    pub note: Option<String>,
}

fn normalize(items: Vec<RawTrack>) -> Vec<Track> {
    items.into_iter().map(Track::from).collect()
}

#[async_trait]
pub trait RecommendationService: Send + Sync {
    async fn search(&self, mood: MoodKey, min_tracks: u32) -> ServiceResult<SearchResult>;

    async fn playlist(&self, mood: MoodKey, min_tracks: u32) -> ServiceResult<PlaylistSuggestion>;
}

pub struct RagClient {
    http: reqwest::Client,
    base_url: String,
}

impl RagClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ServiceResult<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        mood: MoodKey,
        min_tracks: u32,
    ) -> ServiceResult<T> {
        let url = join_url(&self.base_url, path);
        debug!(url = %url, mood = %mood, min_tracks, "Querying recommendations");
        let response = self
            .http
            .post(url)
            .json(&RagRequest {
                emotion: mood,
                min_tracks,
            })
            .send()
            .await?;
        read_json(response).await
    }
}

#[async_trait]
impl RecommendationService for RagClient {
    async fn search(&self, mood: MoodKey, min_tracks: u32) -> ServiceResult<SearchResult> {
        let raw: RawSearchResponse = self.post("/rag/search", mood, min_tracks).await?;
        let tracks = normalize(raw.items);
        Ok(SearchResult {
            emotion: raw.emotion.unwrap_or_else(|| mood.to_string()),
            requested_min: raw.requested_min.unwrap_or(min_tracks),
            returned: raw.returned.unwrap_or(tracks.len() as u32),
            note: raw.note.filter(|n| !n.trim().is_empty()),
            tracks,
        })
    }

    async fn playlist(&self, mood: MoodKey, min_tracks: u32) -> ServiceResult<PlaylistSuggestion> {
        let raw: RawPlaylistResponse = self.post("/rag/playlist", mood, min_tracks).await?;
        let tracks = normalize(raw.items);
        Ok(PlaylistSuggestion {
            emotion: raw.emotion.unwrap_or_else(|| mood.to_string()),
            title: raw
                .title
                .unwrap_or_else(|| format!("MoodTune · {}", mood)),
            description: raw.description.unwrap_or_default(),
            returned: raw.returned.unwrap_or(tracks.len() as u32),
            tracks,
            uris: raw.uris,
            note: raw.note.filter(|n| !n.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let json = serde_json::to_value(RagRequest {
            emotion: MoodKey::Happy,
            min_tracks: 20,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"emotion": "happy", "min_tracks": 20}));
    }

    #[test]
    fn test_search_reply_tolerates_missing_counters() {
        let raw: RawSearchResponse =
            serde_json::from_str(r#"{"items":[{"title":"A","image_url":"u"}]}"#).unwrap();
        let tracks = normalize(raw.items);
        assert_eq!(tracks[0].cover_url.as_deref(), Some("u"));
        assert!(raw.returned.is_none());
    }
}
