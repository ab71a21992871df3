//! Main backend API client
//!
//! Thin typed wrapper over the MoodTune REST API. Flow modules only see the
//! [`BackendApi`] trait so they can be exercised against in-process fakes;
//! the admin screens use the generic resource accessors in [`crate::admin`].

use crate::admin::{Inferences, ListQuery, OAuthTokens, Playlists, Sessions};
use crate::auth::SessionStore;
use crate::error::ServiceResult;
use crate::services::http::{build_http_client, join_url, read_json, segment};
use async_trait::async_trait;
use moodtune_common::models::{
    DeleteAck, HealthResponse, Inference, InferenceCreate, LoginRequest, LoginResponse,
    MusicProvider, OAuthToken, OAuthTokenUpsert, Paginated, Playlist, PlaylistCreate,
    ValidTokenResponse,
};
use reqwest::{Method, RequestBuilder};
use std::time::Duration;
use tracing::debug;

/// Backend operations used by the user-facing flows
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn health(&self) -> ServiceResult<HealthResponse>;

    /// `POST /sessions/login`; also creates the server-side session
    async fn login(&self, request: &LoginRequest) -> ServiceResult<LoginResponse>;

    async fn delete_session(&self, session_id: &str) -> ServiceResult<DeleteAck>;

    async fn create_inference(&self, body: &InferenceCreate) -> ServiceResult<Inference>;

    async fn create_playlist(&self, body: &PlaylistCreate) -> ServiceResult<Playlist>;

    async fn list_playlists(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> ServiceResult<Paginated<Playlist>>;

    async fn upsert_oauth_token(&self, body: &OAuthTokenUpsert) -> ServiceResult<OAuthToken>;

    /// Backend-managed valid token (decrypts and refreshes as needed)
    async fn get_valid_token(
        &self,
        user_id: &str,
        provider: MusicProvider,
    ) -> ServiceResult<ValidTokenResponse>;
}

/// HTTP implementation of [`BackendApi`]
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    explicit_bearer: Option<String>,
    session: Option<SessionStore>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ServiceResult<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            base_url: base_url.into(),
            explicit_bearer: None,
            session: None,
        })
    }

    /// Always send this bearer token (takes precedence over the session id)
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.explicit_bearer = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Use the active session id as bearer token when no explicit token is set
    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn bearer(&self) -> Option<String> {
        self.explicit_bearer
            .clone()
            .or_else(|| self.session.as_ref().and_then(|s| s.session_id()))
    }

    /// Start a request against `path` with auth attached
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = join_url(&self.base_url, path);
        debug!(method = %method, url = %url, "Backend request");
        let builder = self.http.request(method, url);
        match self.bearer() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl BackendApi for ApiClient {
    async fn health(&self) -> ServiceResult<HealthResponse> {
        let response = self.request(Method::GET, "/health").send().await?;
        read_json(response).await
    }

    async fn login(&self, request: &LoginRequest) -> ServiceResult<LoginResponse> {
        let response = self
            .request(Method::POST, "/sessions/login")
            .json(request)
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete_session(&self, session_id: &str) -> ServiceResult<DeleteAck> {
        self.resource::<Sessions>().delete(session_id).await
    }

    async fn create_inference(&self, body: &InferenceCreate) -> ServiceResult<Inference> {
        self.resource::<Inferences>().create(body).await
    }

    async fn create_playlist(&self, body: &PlaylistCreate) -> ServiceResult<Playlist> {
        self.resource::<Playlists>().create(body).await
    }

    async fn list_playlists(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> ServiceResult<Paginated<Playlist>> {
        let query = ListQuery::page(limit, offset).filter("user_id", user_id);
        self.resource::<Playlists>().list(&query).await
    }

    async fn upsert_oauth_token(&self, body: &OAuthTokenUpsert) -> ServiceResult<OAuthToken> {
        self.resource::<OAuthTokens>().create(body).await
    }

    async fn get_valid_token(
        &self,
        user_id: &str,
        provider: MusicProvider,
    ) -> ServiceResult<ValidTokenResponse> {
        let path = format!(
            "/oauth-tokens/valid/{}/{}",
            segment(user_id),
            segment(provider.as_str())
        );
        let response = self.request(Method::GET, &path).send().await?;
        read_json(response).await
    }
}
