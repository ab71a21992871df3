//! Authentication: session holder, provider tokens and the OAuth connect flow

pub mod connect;
pub mod session_store;
pub mod tokens;

pub use connect::{ConnectError, OAuthCallback, ProviderConnect, OAUTH_STATE_KEY};
pub use session_store::{SessionStore, SESSION_KEY};
pub use tokens::{TokenError, TokenManager, TokenMetadata, TOKEN_METADATA_KEY};

use crate::busy::BusyGuard;
use crate::error::ServiceError;
use crate::services::api_client::BackendApi;
use moodtune_common::models::{LoginRequest, UserProfile};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

const DEVICE_INFO_MAX: usize = 180;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email and password are required")]
    MissingCredentials,

    #[error("A login is already in progress")]
    Busy,

    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("Could not store session: {0}")]
    Storage(#[from] moodtune_common::Error),
}

/// What happened to the remote session on logout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// No session was active
    NoSession,
    /// Remote session deleted
    RemoteDeleted,
    /// Local state cleared, remote delete failed and was ignored
    RemoteDeleteFailed(String),
}

/// Device description sent with login
pub fn device_info() -> String {
    let info = format!(
        "moodtune-cli/{} ({} {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    info.chars().take(DEVICE_INFO_MAX).collect()
}

/// Login/logout on top of a [`SessionStore`]
pub struct AuthSession {
    api: Arc<dyn BackendApi>,
    store: SessionStore,
    logging_in: AtomicBool,
}

impl AuthSession {
    pub fn new(api: Arc<dyn BackendApi>, store: SessionStore) -> Self {
        Self {
            api,
            store,
            logging_in: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.store.user()
    }

    pub fn session_id(&self) -> Option<String> {
        self.store.session_id()
    }

    pub fn is_logging_in(&self) -> bool {
        self.logging_in.load(Ordering::SeqCst)
    }

    /// Exchange credentials for a session and persist it
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let _guard = BusyGuard::acquire(&self.logging_in).ok_or(AuthError::Busy)?;

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            device_info: Some(device_info()),
            ip_hash: None,
        };
        let response = self.api.login(&request).await?;
        self.store
            .set(response.session_id, response.user.clone())?;
        info!(user_id = %response.user.user_id, "Logged in");
        Ok(response.user)
    }

    /// Clear local state, then try to delete the remote session
    ///
    /// Never fails: remote errors are logged and reported in the outcome.
    pub async fn logout(&self) -> LogoutOutcome {
        let session_id = self.store.session_id();
        if let Err(e) = self.store.clear() {
            warn!("Failed to remove persisted session: {}", e);
        }

        let Some(session_id) = session_id else {
            return LogoutOutcome::NoSession;
        };

        match self.api.delete_session(&session_id).await {
            Ok(_) => {
                info!("Logged out");
                LogoutOutcome::RemoteDeleted
            }
            Err(e) => {
                warn!("Remote session delete failed (ignored): {}", e);
                LogoutOutcome::RemoteDeleteFailed(e.to_string())
            }
        }
    }
}
