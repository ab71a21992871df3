//! Provider access tokens
//!
//! The backend owns the encrypted provider tokens and refreshes them on
//! demand; this side only keeps display metadata in the session-scoped store
//! and asks the backend for a valid token whenever one is needed.

use crate::error::ServiceError;
use crate::services::api_client::BackendApi;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use moodtune_common::models::{MusicProvider, UserProfile};
use moodtune_common::storage::{get_json, set_json, KeyValueStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Session-store key of the token metadata
pub const TOKEN_METADATA_KEY: &str = "moodtune_spotify_token_data";

/// Tokens expiring within this window are shown as expired
pub const EXPIRY_BUFFER_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// `YYYY-MM-DD HH:MM:SS` UTC or RFC 3339
    pub expires_at: String,
    pub token_id: String,
}

impl TokenMetadata {
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.expires_at)
    }

    /// True when less than five minutes remain (or the timestamp is unreadable)
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at_utc() {
            Some(expires) => expires - now < Duration::seconds(EXPIRY_BUFFER_SECS),
            None => true,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Parse the backend's timestamp forms
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Log in to use your music account")]
    NotAuthenticated,

    #[error("Music account not connected. Connect it first.")]
    NotConnected,

    #[error("Music token not found. Please reconnect your account.")]
    NotFound,

    #[error("Music token refresh failed. Please reconnect your account.")]
    RefreshFailed,

    #[error("{0}")]
    Service(ServiceError),

    #[error("Could not store token metadata: {0}")]
    Storage(#[from] moodtune_common::Error),
}

impl TokenError {
    /// User must go through the connect flow again
    pub fn needs_reconnect(&self) -> bool {
        matches!(
            self,
            TokenError::NotConnected | TokenError::NotFound | TokenError::RefreshFailed
        )
    }
}

/// Hands out valid provider tokens for the current user
pub struct TokenManager {
    api: Arc<dyn BackendApi>,
    store: Arc<dyn KeyValueStore>,
    provider: MusicProvider,
}

impl TokenManager {
    pub fn new(api: Arc<dyn BackendApi>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            api,
            store,
            provider: MusicProvider::Spotify,
        }
    }

    /// Stored metadata; unparsable entries are removed
    pub fn metadata(&self) -> Option<TokenMetadata> {
        let raw = self.store.get(TOKEN_METADATA_KEY)?;
        match get_json::<TokenMetadata>(self.store.as_ref(), TOKEN_METADATA_KEY) {
            Some(meta) => Some(meta),
            None => {
                debug!(len = raw.len(), "Dropping unreadable token metadata");
                if let Err(e) = self.store.remove(TOKEN_METADATA_KEY) {
                    warn!("Failed to drop token metadata: {}", e);
                }
                None
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.metadata().is_some()
    }

    pub fn save(&self, metadata: &TokenMetadata) -> Result<(), TokenError> {
        set_json(self.store.as_ref(), TOKEN_METADATA_KEY, metadata)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), TokenError> {
        self.store.remove(TOKEN_METADATA_KEY)?;
        Ok(())
    }

    /// Get a usable access token from the backend (refreshed if needed)
    ///
    /// Failures are terminal; nothing is retried.
    pub async fn valid_token(&self, user: Option<&UserProfile>) -> Result<String, TokenError> {
        let user = user.ok_or(TokenError::NotAuthenticated)?;
        let mut metadata = self.metadata().ok_or(TokenError::NotConnected)?;

        match self.api.get_valid_token(&user.user_id, self.provider).await {
            Ok(valid) => {
                if valid.was_refreshed {
                    info!(user_id = %user.user_id, "Provider token refreshed by backend");
                }
                metadata.access_token = valid.access_token.clone();
                if let Some(expires_at) = valid.expires_at {
                    metadata.expires_at = expires_at;
                }
                self.save(&metadata)?;
                Ok(valid.access_token)
            }
            Err(e) if e.is_not_found() => {
                warn!(user_id = %user.user_id, "Provider token missing on backend");
                if let Err(clear_err) = self.clear() {
                    warn!("Failed to clear token metadata: {}", clear_err);
                }
                Err(TokenError::NotFound)
            }
            Err(e) if e.status() == Some(502) => Err(TokenError::RefreshFailed),
            Err(e) => Err(TokenError::Service(e)),
        }
    }
}
