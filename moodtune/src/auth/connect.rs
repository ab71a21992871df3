//! Music account connection (Spotify OAuth)
//!
//! `begin` obtains an authorize URL and remembers its `state`; `complete`
//! verifies the state, stores the encoded tokens on the backend and keeps
//! display metadata locally.

use super::session_store::SessionStore;
use super::tokens::{TokenError, TokenManager, TokenMetadata};
use crate::error::ServiceError;
use crate::services::api_client::BackendApi;
use crate::services::music_client::{AuthorizeParams, AuthorizeUrl, MusicService};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use moodtune_common::models::{MusicProvider, OAuthTokenUpsert};
use moodtune_common::storage::KeyValueStore;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Session-store key of the pending OAuth state
pub const OAUTH_STATE_KEY: &str = "spotify_oauth_state";

pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("OAuth state does not match. Please try connecting again.")]
    StateMismatch,

    #[error("User not authenticated")]
    NotAuthenticated,

    #[error("Authorization failed: {0}")]
    Denied(String),

    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Could not store OAuth state: {0}")]
    Storage(#[from] moodtune_common::Error),

    #[error("Token lifetime of {0}s is out of range")]
    InvalidExpiry(i64),
}

/// Tokens handed back by the provider redirect
#[derive(Debug, Clone)]
pub struct OAuthCallback {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub state: String,
}

/// `YYYY-MM-DD HH:MM:SS` in UTC
pub fn format_expires_at(
    now: DateTime<Utc>,
    expires_in: Option<i64>,
) -> Result<String, ConnectError> {
    let secs = expires_in
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    let expires = Duration::try_seconds(secs)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or(ConnectError::InvalidExpiry(secs))?;
    Ok(expires.format("%Y-%m-%d %H:%M:%S").to_string())
}

pub fn encode_token(token: &str) -> String {
    BASE64.encode(token.as_bytes())
}

pub struct ProviderConnect {
    music: Arc<dyn MusicService>,
    api: Arc<dyn BackendApi>,
    session: SessionStore,
    tokens: Arc<TokenManager>,
    state_store: Arc<dyn KeyValueStore>,
}

impl ProviderConnect {
    pub fn new(
        music: Arc<dyn MusicService>,
        api: Arc<dyn BackendApi>,
        session: SessionStore,
        tokens: Arc<TokenManager>,
        state_store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            music,
            api,
            session,
            tokens,
            state_store,
        }
    }

    pub fn pending_state(&self) -> Option<String> {
        self.state_store.get(OAUTH_STATE_KEY)
    }

    /// Request an authorize URL and remember its state
    pub async fn begin(&self, callback_url: &str) -> Result<AuthorizeUrl, ConnectError> {
        self.state_store.remove(OAUTH_STATE_KEY)?;

        let params = AuthorizeParams {
            callback_url: Some(callback_url.to_string()),
            ..Default::default()
        };
        let auth = self.music.authorize_url(&params).await?;
        self.state_store.set(OAUTH_STATE_KEY, auth.state.clone())?;
        info!("Spotify authorization started");
        Ok(auth)
    }

    /// Finish the flow with tokens from the provider redirect
    pub async fn complete(&self, callback: OAuthCallback) -> Result<TokenMetadata, ConnectError> {
        let stored = self.pending_state();
        if stored.as_deref() != Some(callback.state.as_str()) {
            warn!("OAuth state mismatch");
            self.forget_state();
            return Err(ConnectError::StateMismatch);
        }

        let user = self.session.user().ok_or(ConnectError::NotAuthenticated)?;
        let expires_at = format_expires_at(Utc::now(), callback.expires_in)?;

        let upsert = OAuthTokenUpsert {
            token_id: None,
            user_id: user.user_id.clone(),
            provider: MusicProvider::Spotify,
            access_cipher_b64: encode_token(&callback.access_token),
            refresh_cipher_b64: callback.refresh_token.as_deref().map(encode_token),
            expires_at: Some(expires_at.clone()),
        };
        let record = self.api.upsert_oauth_token(&upsert).await?;

        let metadata = TokenMetadata {
            access_token: callback.access_token,
            refresh_token: callback.refresh_token,
            expires_at,
            token_id: record.token_id,
        };
        self.tokens.save(&metadata)?;
        self.forget_state();

        info!(user_id = %user.user_id, "Spotify account connected");
        Ok(metadata)
    }

    /// Authorization-code variant: exchange through the music service first
    pub async fn complete_with_code(
        &self,
        code: &str,
        state: &str,
    ) -> Result<TokenMetadata, ConnectError> {
        if self.pending_state().as_deref() != Some(state) {
            warn!("OAuth state mismatch");
            self.forget_state();
            return Err(ConnectError::StateMismatch);
        }

        let tokens = self.music.exchange_code(code, state, None).await?;
        self.complete(OAuthCallback {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            state: state.to_string(),
        })
        .await
    }

    pub fn disconnect(&self) -> Result<(), ConnectError> {
        self.tokens.clear()?;
        info!("Spotify account disconnected locally");
        Ok(())
    }

    fn forget_state(&self) {
        if let Err(e) = self.state_store.remove(OAUTH_STATE_KEY) {
            warn!("Failed to clear OAuth state: {}", e);
        }
    }
}
