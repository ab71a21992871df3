//! MoodTune client library
//!
//! Photo-based mood detection, mood-driven track recommendations and playlist
//! persistence, on top of four collaborator services (main API, FER, RAG and
//! the music-provider service).

pub mod admin;
pub mod auth;
mod busy;
pub mod detection;
pub mod error;
pub mod links;
pub mod playlist;
pub mod recommendation;
pub mod services;
pub mod tracks;

pub use crate::error::{InitError, ServiceError, ServiceResult};

use crate::auth::connect::OAUTH_STATE_KEY;
use crate::auth::tokens::TOKEN_METADATA_KEY;
use crate::auth::{AuthSession, ProviderConnect, SessionStore, TokenManager};
use crate::auth::LogoutOutcome;
use crate::detection::DetectionOrchestrator;
use crate::playlist::PlaylistService;
use crate::recommendation::Recommender;
use crate::services::health::{self, HealthReport};
use crate::services::{ApiClient, BackendApi, FerClient, MusicClient, RagClient};
use moodtune_common::config::Settings;
use moodtune_common::storage::{JsonFileStore, KeyValueStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// File name of the per-login scoped store (token metadata, OAuth state)
pub const SCOPED_STORE_FILE: &str = "session_scope.json";

/// Everything a front end needs, wired from [`Settings`]
pub struct AppContext {
    pub settings: Settings,
    pub api: Arc<ApiClient>,
    pub fer: Arc<FerClient>,
    pub rag: Arc<RagClient>,
    pub music: Arc<MusicClient>,
    pub session: SessionStore,
    pub auth: AuthSession,
    pub tokens: Arc<TokenManager>,
    pub connect: ProviderConnect,
    pub recommender: Recommender,
    pub detector: DetectionOrchestrator,
    pub playlists: PlaylistService,
    scoped: Arc<dyn KeyValueStore>,
}

impl AppContext {
    /// Open the file-backed stores in the data folder and wire all services
    pub fn from_settings(settings: Settings) -> Result<Self, InitError> {
        settings.ensure_data_dir()?;
        let persistent = Arc::new(JsonFileStore::open(settings.storage_path()));
        let scoped = Arc::new(JsonFileStore::open(
            settings.data_dir.join(SCOPED_STORE_FILE),
        ));
        Self::with_stores(settings, persistent, scoped)
    }

    /// Wire services over caller-provided stores
    pub fn with_stores(
        settings: Settings,
        persistent: Arc<dyn KeyValueStore>,
        scoped: Arc<dyn KeyValueStore>,
    ) -> Result<Self, InitError> {
        let timeout = Duration::from_secs(settings.request_timeout_secs);
        let session = SessionStore::open(persistent);

        let api = Arc::new(
            ApiClient::new(settings.api_base_url.clone(), timeout)?
                .with_bearer_token(settings.api_bearer_token.clone())
                .with_session(session.clone()),
        );
        let fer = Arc::new(FerClient::new(settings.fer_endpoint_url.clone(), timeout)?);
        let rag = Arc::new(RagClient::new(settings.rag_base_url.clone(), timeout)?);
        let music = Arc::new(MusicClient::new(settings.music_base_url.clone(), timeout)?);

        let backend: Arc<dyn BackendApi> = api.clone();
        let tokens = Arc::new(TokenManager::new(backend.clone(), scoped.clone()));
        let recommender = Recommender::new(rag.clone());

        let auth = AuthSession::new(backend.clone(), session.clone());
        let connect = ProviderConnect::new(
            music.clone(),
            backend.clone(),
            session.clone(),
            tokens.clone(),
            scoped.clone(),
        );
        let detector = DetectionOrchestrator::new(fer.clone(), recommender.clone())
            .with_budget(Duration::from_millis(settings.detection_timeout_ms));
        let playlists = PlaylistService::new(
            backend,
            music.clone(),
            tokens.clone(),
            session.clone(),
            recommender.clone(),
        );

        info!(
            api = %settings.api_base_url,
            fer_configured = settings.fer_endpoint_url.is_some(),
            "Application context ready"
        );

        Ok(Self {
            settings,
            api,
            fer,
            rag,
            music,
            session,
            auth,
            tokens,
            connect,
            recommender,
            detector,
            playlists,
            scoped,
        })
    }

    /// Log out and drop per-login data
    pub async fn logout(&self) -> LogoutOutcome {
        let outcome = self.auth.logout().await;
        for key in [TOKEN_METADATA_KEY, OAUTH_STATE_KEY] {
            if let Err(e) = self.scoped.remove(key) {
                warn!("Failed to clear {}: {}", key, e);
            }
        }
        outcome
    }

    pub async fn health(&self) -> HealthReport {
        health::check_all(
            self.api.as_ref(),
            self.fer.as_ref(),
            &self.settings.rag_base_url,
            &self.settings.music_base_url,
            Duration::from_secs(self.settings.request_timeout_secs),
        )
        .await
    }
}
