//! Playlist persistence and browsing
//!
//! Saving a playlist resolves provider URIs from the selected tracks, obtains
//! a provider token from the backend, builds the playlist at the provider and
//! finally stores a reference record through the main API.

use crate::auth::{SessionStore, TokenError, TokenManager};
use crate::error::ServiceError;
use crate::links::collect_provider_uris;
use crate::recommendation::{RecommendationError, Recommender};
use crate::services::api_client::BackendApi;
use crate::services::music_client::{
    CreatedPlaylist, MoodtunePlaylistRequest, MusicService, PlaylistContentRequest,
    PlaylistCreateRequest, PlaylistDetails,
};
use crate::services::rag_client::PlaylistSuggestion;
use crate::tracks::Track;
use moodtune_common::models::{MusicProvider, Playlist, PlaylistCreate};
use moodtune_common::{Emotion, Intention, MoodKey};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Page size when listing saved playlists
pub const SAVED_PLAYLISTS_LIMIT: u32 = 50;

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("Log in to save playlists")]
    NotAuthenticated,

    #[error("Select at least one track")]
    NothingSelected,

    #[error("The selected tracks have no Spotify-compatible URIs")]
    NoCompatibleUris,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Music provider rejected the credentials: {0}. Please reconnect your account.")]
    ProviderAuth(String),

    #[error("Music provider rate limit reached: {0}")]
    RateLimited(String),

    #[error("Music provider rejected the track list: {0}")]
    InvalidUris(String),

    #[error("Playlist created at the provider but not recorded: {message}")]
    RecordFailed {
        deep_link_url: String,
        message: String,
    },

    #[error(transparent)]
    Recommendation(#[from] RecommendationError),

    #[error("{0}")]
    Service(ServiceError),
}

/// Classify a music-service failure
pub fn map_music_error(err: ServiceError) -> PlaylistError {
    match err.status() {
        Some(401) | Some(403) => PlaylistError::ProviderAuth(err.to_string()),
        Some(429) => PlaylistError::RateLimited(err.to_string()),
        Some(400) | Some(422) => PlaylistError::InvalidUris(err.to_string()),
        _ => PlaylistError::Service(err),
    }
}

/// What to build at the provider
#[derive(Debug, Clone)]
pub struct PlaylistDraft {
    pub title: String,
    pub description: Option<String>,
    /// Selected tracks in display order
    pub tracks: Vec<Track>,
    pub emotion: Option<Emotion>,
    pub intention: Option<Intention>,
    pub inference_id: Option<String>,
}

impl PlaylistDraft {
    /// Draft from a suggestion and the user's selection
    pub fn from_suggestion(suggestion: &PlaylistSuggestion, selected: Vec<Track>) -> Self {
        Self {
            title: suggestion.title.clone(),
            description: Some(suggestion.description.clone()).filter(|d| !d.trim().is_empty()),
            tracks: selected,
            emotion: None,
            intention: None,
            inference_id: None,
        }
    }

    /// Default title for a mood
    pub fn default_title(mood: MoodKey) -> String {
        format!("MoodTune · {}", mood)
    }
}

/// Outcome of a successful save
#[derive(Debug, Clone)]
pub struct SavedPlaylist {
    pub created: CreatedPlaylist,
    pub record: Playlist,
    /// Tracks dropped for lacking a provider URI
    pub skipped: usize,
}

pub struct PlaylistService {
    api: Arc<dyn BackendApi>,
    music: Arc<dyn MusicService>,
    tokens: Arc<TokenManager>,
    session: SessionStore,
    recommender: Recommender,
}

impl PlaylistService {
    pub fn new(
        api: Arc<dyn BackendApi>,
        music: Arc<dyn MusicService>,
        tokens: Arc<TokenManager>,
        session: SessionStore,
        recommender: Recommender,
    ) -> Self {
        Self {
            api,
            music,
            tokens,
            session,
            recommender,
        }
    }

    /// Ask the recommendation service for a titled playlist
    pub async fn suggest(
        &self,
        mood: MoodKey,
        min_tracks: u32,
    ) -> Result<PlaylistSuggestion, PlaylistError> {
        Ok(self.recommender.suggest_playlist(mood, min_tracks).await?)
    }

    /// Build the playlist at the provider and record it
    ///
    /// URI resolution happens before any provider call; token failures are
    /// terminal and ask for reconnection.
    pub async fn save(&self, draft: &PlaylistDraft) -> Result<SavedPlaylist, PlaylistError> {
        let user = self.session.user().ok_or(PlaylistError::NotAuthenticated)?;
        if draft.tracks.is_empty() {
            return Err(PlaylistError::NothingSelected);
        }

        let uris = collect_provider_uris(&draft.tracks);
        if uris.is_empty() {
            return Err(PlaylistError::NoCompatibleUris);
        }
        let skipped = draft
            .tracks
            .iter()
            .filter(|t| {
                t.uri
                    .as_deref()
                    .and_then(crate::links::normalize_provider_track_uri)
                    .is_none()
            })
            .count();
        if skipped > 0 {
            warn!(skipped, "Tracks without provider URI left out of playlist");
        }

        let access_token = self.tokens.valid_token(Some(&user)).await?;

        let request = MoodtunePlaylistRequest {
            playlist: PlaylistCreateRequest {
                provider: MusicProvider::Spotify,
                provider_access_token: access_token,
                title: draft.title.clone(),
                description: draft.description.clone(),
                uris,
            },
            user_id: Some(user.user_id.clone()),
            inference_id: draft.inference_id.clone(),
            intention: draft.intention,
            emotion: draft.emotion.map(|e| e.to_string()),
        };
        let created = self
            .music
            .create_moodtune_playlist(&request)
            .await
            .map_err(map_music_error)?;

        let record_body = PlaylistCreate {
            user_id: user.user_id.clone(),
            provider: created.provider,
            external_playlist_id: created.external_playlist_id.clone(),
            deep_link_url: created.deep_link_url.clone(),
            title: Some(created.title.clone()),
            description: created.description.clone(),
        };
        let record = self
            .api
            .create_playlist(&record_body)
            .await
            .map_err(|e| PlaylistError::RecordFailed {
                deep_link_url: created.deep_link_url.clone(),
                message: e.to_string(),
            })?;

        info!(
            playlist_id = %record.playlist_id,
            tracks_added = created.tracks_added,
            "Playlist saved"
        );
        Ok(SavedPlaylist {
            created,
            record,
            skipped,
        })
    }

    /// The user's saved playlist records
    pub async fn list_saved(&self) -> Result<Vec<Playlist>, PlaylistError> {
        let user = self.session.user().ok_or(PlaylistError::NotAuthenticated)?;
        let page = self
            .api
            .list_playlists(&user.user_id, SAVED_PLAYLISTS_LIMIT, 0)
            .await
            .map_err(PlaylistError::Service)?;
        Ok(page.items)
    }

    /// Provider-side content of a saved playlist
    pub async fn fetch_content(&self, playlist: &Playlist) -> Result<PlaylistDetails, PlaylistError> {
        let user = self.session.user().ok_or(PlaylistError::NotAuthenticated)?;
        let access_token = self.tokens.valid_token(Some(&user)).await?;

        let external_playlist_id = playlist
            .external_playlist_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| playlist.playlist_id.clone());
        let request = PlaylistContentRequest {
            provider: playlist.provider.unwrap_or_default(),
            external_playlist_id,
            provider_access_token: access_token,
        };
        self.music
            .fetch_playlist_content(&request)
            .await
            .map_err(map_music_error)
    }
}
