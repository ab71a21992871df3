//! Music-provider service client
//!
//! Builds playlists directly at the provider and brokers the Spotify OAuth
//! exchange. The provider access token travels in the request body.

use crate::error::ServiceResult;
use crate::services::http::{build_http_client, join_url, read_json};
use async_trait::async_trait;
use moodtune_common::models::{Intention, MusicProvider};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// `POST /playlists` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistCreateRequest {
    pub provider: MusicProvider,
    pub provider_access_token: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub uris: Vec<String>,
}

/// `POST /playlists/moodtune` body: a playlist tied to a detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodtunePlaylistRequest {
    #[serde(flatten)]
    pub playlist: PlaylistCreateRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention: Option<Intention>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
}

/// Playlist created at the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedPlaylist {
    pub provider: MusicProvider,
    pub external_playlist_id: String,
    pub deep_link_url: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tracks_added: u32,
}

/// `POST /playlists/content` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistContentRequest {
    pub provider: MusicProvider,
    pub external_playlist_id: String,
    pub provider_access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTrack {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub added_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistImage {
    #[serde(default)]
    pub url: Option<String>,
}

/// Provider-side playlist content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistDetails {
    pub provider: MusicProvider,
    pub playlist_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub tracks_total: Option<u32>,
    #[serde(default)]
    pub tracks: Vec<ProviderTrack>,
    #[serde(default)]
    pub images: Vec<PlaylistImage>,
    #[serde(default)]
    pub external_url: Option<String>,
}

/// Optional parameters of the authorize-URL request
#[derive(Debug, Clone, Default)]
pub struct AuthorizeParams {
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeUrl {
    pub authorize_url: String,
    pub state: String,
}

/// Tokens returned by the code exchange or a refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTokens {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[async_trait]
pub trait MusicService: Send + Sync {
    async fn create_playlist(&self, body: &PlaylistCreateRequest) -> ServiceResult<CreatedPlaylist>;

    async fn create_moodtune_playlist(
        &self,
        body: &MoodtunePlaylistRequest,
    ) -> ServiceResult<CreatedPlaylist>;

    async fn fetch_playlist_content(
        &self,
        body: &PlaylistContentRequest,
    ) -> ServiceResult<PlaylistDetails>;

    async fn authorize_url(&self, params: &AuthorizeParams) -> ServiceResult<AuthorizeUrl>;

    async fn exchange_code(
        &self,
        code: &str,
        state: &str,
        redirect_uri: Option<&str>,
    ) -> ServiceResult<ProviderTokens>;

    async fn refresh_token(&self, refresh_token: &str) -> ServiceResult<ProviderTokens>;
}

/// HTTP client for the music-provider service
pub struct MusicClient {
    http: reqwest::Client,
    base_url: String,
}

impl MusicClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ServiceResult<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + Sync, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ServiceResult<T> {
        let url = join_url(&self.base_url, path);
        debug!(url = %url, "Music service request");
        let response = self.http.post(url).json(body).send().await?;
        read_json(response).await
    }

    async fn get_with_query<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ServiceResult<T> {
        let url = join_url(&self.base_url, path);
        debug!(url = %url, "Music service request");
        let response = self.http.get(url).query(query).send().await?;
        read_json(response).await
    }
}

#[async_trait]
impl MusicService for MusicClient {
    async fn create_playlist(&self, body: &PlaylistCreateRequest) -> ServiceResult<CreatedPlaylist> {
        self.post("/playlists", body).await
    }

    async fn create_moodtune_playlist(
        &self,
        body: &MoodtunePlaylistRequest,
    ) -> ServiceResult<CreatedPlaylist> {
        self.post("/playlists/moodtune", body).await
    }

    async fn fetch_playlist_content(
        &self,
        body: &PlaylistContentRequest,
    ) -> ServiceResult<PlaylistDetails> {
        self.post("/playlists/content", body).await
    }

    async fn authorize_url(&self, params: &AuthorizeParams) -> ServiceResult<AuthorizeUrl> {
        let mut query = Vec::new();
        if let Some(ref v) = params.redirect_uri {
            query.push(("redirect_uri", v.as_str()));
        }
        if let Some(ref v) = params.scope {
            query.push(("scope", v.as_str()));
        }
        if let Some(ref v) = params.callback_url {
            query.push(("callback_url", v.as_str()));
        }
        self.get_with_query("/auth/spotify", &query).await
    }

    async fn exchange_code(
        &self,
        code: &str,
        state: &str,
        redirect_uri: Option<&str>,
    ) -> ServiceResult<ProviderTokens> {
        let mut query = vec![("code", code), ("state", state)];
        if let Some(uri) = redirect_uri {
            query.push(("redirect_uri", uri));
        }
        self.get_with_query("/auth/spotify/callback", &query).await
    }

    async fn refresh_token(&self, refresh_token: &str) -> ServiceResult<ProviderTokens> {
        self.post(
            "/auth/spotify/refresh",
            &serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }
}
