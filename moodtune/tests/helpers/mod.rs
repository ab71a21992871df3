//! Shared fakes and fixtures for flow tests
#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use moodtune::detection::ImageUpload;
use moodtune::error::{ServiceError, ServiceResult};
use moodtune::services::music_client::{
    AuthorizeParams, AuthorizeUrl, CreatedPlaylist, MoodtunePlaylistRequest, MusicService,
    PlaylistContentRequest, PlaylistCreateRequest, PlaylistDetails, ProviderTokens,
};
use moodtune::services::rag_client::{PlaylistSuggestion, RecommendationService, SearchResult};
use moodtune::services::{BackendApi, FerResponse, FerService};
use moodtune::tracks::Track;
use moodtune_common::models::{
    DeleteAck, HealthResponse, Inference, InferenceCreate, LoginRequest, LoginResponse,
    MusicProvider, OAuthToken, OAuthTokenUpsert, Paginated, Playlist, PlaylistCreate, UserProfile,
    ValidTokenResponse,
};
use moodtune_common::MoodKey;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub fn profile(user_id: &str) -> UserProfile {
    UserProfile {
        user_id: user_id.to_string(),
        display_name: Some("Test User".to_string()),
        email_hash: None,
    }
}

/// Solid grey PNG of the given brightness
pub fn png_upload(value: u8) -> ImageUpload {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(32, 24, Rgb([value; 3]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    ImageUpload::new("face.png", "image/png", out.into_inner())
}

pub fn api_error(status: u16, message: &str) -> ServiceError {
    ServiceError::Api {
        status,
        message: message.to_string(),
    }
}

pub fn track(uri: Option<&str>, title: &str) -> Track {
    Track {
        uri: uri.map(str::to_string),
        title: Some(title.to_string()),
        ..Default::default()
    }
}

// ========================================
// FER
// ========================================

pub enum FerBehavior {
    Reply(FerResponse),
    Fail(ServiceError),
    /// Sleep longer than any budget, then reply
    Hang(Duration),
}

pub struct FakeFer {
    pub configured: bool,
    pub behavior: FerBehavior,
    pub calls: AtomicUsize,
    pub saw_cancel: AtomicUsize,
}

impl FakeFer {
    pub fn new(behavior: FerBehavior) -> Self {
        Self {
            configured: true,
            behavior,
            calls: AtomicUsize::new(0),
            saw_cancel: AtomicUsize::new(0),
        }
    }

    pub fn replying(emotion: &str, confidence: Option<f64>, model: Option<&str>) -> Self {
        Self::new(FerBehavior::Reply(FerResponse {
            emotion: emotion.to_string(),
            confidence,
            model_version: model.map(str::to_string),
        }))
    }

    pub fn unconfigured() -> Self {
        let mut fer = Self::new(FerBehavior::Fail(ServiceError::NotConfigured("FER")));
        fer.configured = false;
        fer
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FerService for FakeFer {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn infer(
        &self,
        _image: &ImageUpload,
        cancel: CancellationToken,
    ) -> ServiceResult<FerResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            FerBehavior::Reply(r) => Ok(r.clone()),
            FerBehavior::Fail(e) => Err(match e {
                ServiceError::Api { status, message } => ServiceError::Api {
                    status: *status,
                    message: message.clone(),
                },
                ServiceError::NotConfigured(name) => ServiceError::NotConfigured(name),
                other => ServiceError::Network(other.to_string()),
            }),
            FerBehavior::Hang(d) => {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        self.saw_cancel.fetch_add(1, Ordering::SeqCst);
                        Err(ServiceError::Aborted)
                    }
                    _ = tokio::time::sleep(*d) => Ok(FerResponse {
                        emotion: "joy".to_string(),
                        confidence: Some(0.9),
                        model_version: None,
                    }),
                }
            }
        }
    }

    async fn health(&self) -> ServiceResult<bool> {
        Ok(self.configured)
    }
}

// ========================================
// Recommendations
// ========================================

#[derive(Default)]
pub struct FakeRag {
    pub tracks: Vec<Track>,
    pub fail: bool,
    pub searches: Mutex<Vec<(MoodKey, u32)>>,
}

impl FakeRag {
    pub fn with_tracks(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            ..Default::default()
        }
    }

    pub fn searches(&self) -> Vec<(MoodKey, u32)> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecommendationService for FakeRag {
    async fn search(&self, mood: MoodKey, min_tracks: u32) -> ServiceResult<SearchResult> {
        self.searches.lock().unwrap().push((mood, min_tracks));
        if self.fail {
            return Err(api_error(503, "rag offline"));
        }
        Ok(SearchResult {
            emotion: mood.to_string(),
            requested_min: min_tracks,
            returned: self.tracks.len() as u32,
            note: None,
            tracks: self.tracks.clone(),
        })
    }

    async fn playlist(&self, mood: MoodKey, min_tracks: u32) -> ServiceResult<PlaylistSuggestion> {
        self.searches.lock().unwrap().push((mood, min_tracks));
        if self.fail {
            return Err(api_error(503, "rag offline"));
        }
        Ok(PlaylistSuggestion {
            emotion: mood.to_string(),
            title: format!("MoodTune · {}", mood),
            description: "Suggested".to_string(),
            returned: self.tracks.len() as u32,
            tracks: self.tracks.clone(),
            uris: vec![],
            note: None,
        })
    }
}

// ========================================
// Backend
// ========================================

#[derive(Default)]
pub struct FakeBackend {
    pub login_reply: Mutex<Option<LoginResponse>>,
    pub login_delay: Option<Duration>,
    pub fail_delete: bool,
    pub valid_token_status: Option<u16>,
    pub deleted_sessions: Mutex<Vec<String>>,
    pub inferences: Mutex<Vec<InferenceCreate>>,
    pub playlists: Mutex<Vec<PlaylistCreate>>,
    pub upserts: Mutex<Vec<OAuthTokenUpsert>>,
    pub logins: AtomicUsize,
    pub token_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn with_login(session_id: &str, user_id: &str) -> Self {
        let backend = Self::default();
        *backend.login_reply.lock().unwrap() = Some(LoginResponse {
            session_id: session_id.to_string(),
            user: profile(user_id),
        });
        backend
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted_sessions.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn health(&self) -> ServiceResult<HealthResponse> {
        Ok(HealthResponse {
            status: "ok".to_string(),
        })
    }

    async fn login(&self, _request: &LoginRequest) -> ServiceResult<LoginResponse> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.login_delay {
            tokio::time::sleep(delay).await;
        }
        self.login_reply
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| api_error(401, "Invalid credentials"))
    }

    async fn delete_session(&self, session_id: &str) -> ServiceResult<DeleteAck> {
        self.deleted_sessions
            .lock()
            .unwrap()
            .push(session_id.to_string());
        if self.fail_delete {
            return Err(ServiceError::Network("connection reset".to_string()));
        }
        Ok(DeleteAck {
            deleted: true,
            id: Some(session_id.to_string()),
        })
    }

    async fn create_inference(&self, body: &InferenceCreate) -> ServiceResult<Inference> {
        self.inferences.lock().unwrap().push(body.clone());
        Ok(Inference {
            inference_id: "inf-1".to_string(),
            session_id: body.session_id.clone(),
            emotion: body.emotion,
            confidence: body.confidence,
            intention: body.intention,
            latency_ms: body.latency_ms,
            model_version: body.model_version.clone(),
            created_at: None,
        })
    }

    async fn create_playlist(&self, body: &PlaylistCreate) -> ServiceResult<Playlist> {
        self.playlists.lock().unwrap().push(body.clone());
        Ok(Playlist {
            playlist_id: "pl-1".to_string(),
            user_id: Some(body.user_id.clone()),
            provider: Some(body.provider),
            external_playlist_id: Some(body.external_playlist_id.clone()),
            deep_link_url: Some(body.deep_link_url.clone()),
            title: body.title.clone(),
            description: body.description.clone(),
            created_at: None,
        })
    }

    async fn list_playlists(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> ServiceResult<Paginated<Playlist>> {
        let items = self
            .playlists
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id)
            .enumerate()
            .map(|(i, p)| Playlist {
                playlist_id: format!("pl-{}", i + 1),
                user_id: Some(p.user_id.clone()),
                provider: Some(p.provider),
                external_playlist_id: Some(p.external_playlist_id.clone()),
                deep_link_url: Some(p.deep_link_url.clone()),
                title: p.title.clone(),
                description: p.description.clone(),
                created_at: None,
            })
            .collect();
        Ok(Paginated {
            items,
            limit,
            offset,
        })
    }

    async fn upsert_oauth_token(&self, body: &OAuthTokenUpsert) -> ServiceResult<OAuthToken> {
        self.upserts.lock().unwrap().push(body.clone());
        Ok(OAuthToken {
            token_id: "tok-1".to_string(),
            user_id: body.user_id.clone(),
            provider: body.provider,
            expires_at: body.expires_at.clone(),
            created_at: None,
            updated_at: None,
        })
    }

    async fn get_valid_token(
        &self,
        _user_id: &str,
        _provider: MusicProvider,
    ) -> ServiceResult<ValidTokenResponse> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        match self.valid_token_status {
            Some(status) => Err(api_error(status, "token problem")),
            None => Ok(ValidTokenResponse {
                access_token: "fresh-access".to_string(),
                expires_at: Some("2099-01-01 00:00:00".to_string()),
                was_refreshed: true,
            }),
        }
    }
}

// ========================================
// Music provider
// ========================================

#[derive(Default)]
pub struct FakeMusic {
    pub fail_status: Option<u16>,
    pub created: Mutex<Vec<MoodtunePlaylistRequest>>,
    pub content_requests: Mutex<Vec<PlaylistContentRequest>>,
    pub auth_state: String,
}

impl FakeMusic {
    pub fn create_calls(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

#[async_trait]
impl MusicService for FakeMusic {
    async fn create_playlist(&self, body: &PlaylistCreateRequest) -> ServiceResult<CreatedPlaylist> {
        Ok(CreatedPlaylist {
            provider: body.provider,
            external_playlist_id: "ext-1".to_string(),
            deep_link_url: "https://open.spotify.com/playlist/ext1".to_string(),
            title: body.title.clone(),
            description: body.description.clone(),
            tracks_added: body.uris.len() as u32,
        })
    }

    async fn create_moodtune_playlist(
        &self,
        body: &MoodtunePlaylistRequest,
    ) -> ServiceResult<CreatedPlaylist> {
        self.created.lock().unwrap().push(body.clone());
        if let Some(status) = self.fail_status {
            return Err(api_error(status, "provider said no"));
        }
        self.create_playlist(&body.playlist).await
    }

    async fn fetch_playlist_content(
        &self,
        body: &PlaylistContentRequest,
    ) -> ServiceResult<PlaylistDetails> {
        self.content_requests.lock().unwrap().push(body.clone());
        Ok(PlaylistDetails {
            provider: body.provider,
            playlist_id: body.external_playlist_id.clone(),
            title: Some("Saved".to_string()),
            description: None,
            owner: None,
            tracks_total: Some(0),
            tracks: vec![],
            images: vec![],
            external_url: None,
        })
    }

    async fn authorize_url(&self, params: &AuthorizeParams) -> ServiceResult<AuthorizeUrl> {
        Ok(AuthorizeUrl {
            authorize_url: format!(
                "https://accounts.spotify.com/authorize?cb={}",
                params.callback_url.clone().unwrap_or_default()
            ),
            state: self.auth_state.clone(),
        })
    }

    async fn exchange_code(
        &self,
        code: &str,
        _state: &str,
        _redirect_uri: Option<&str>,
    ) -> ServiceResult<ProviderTokens> {
        Ok(ProviderTokens {
            provider: Some("spotify".to_string()),
            token_type: Some("Bearer".to_string()),
            scope: None,
            access_token: format!("access-for-{}", code),
            refresh_token: Some("refresh".to_string()),
            expires_in: Some(3600),
        })
    }

    async fn refresh_token(&self, _refresh_token: &str) -> ServiceResult<ProviderTokens> {
        Err(api_error(502, "refresh unsupported in fake"))
    }
}
