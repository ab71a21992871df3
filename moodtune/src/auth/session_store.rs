//! Persisted session holder
//!
//! Single source of truth for "is a session active". The session blob is kept
//! in a [`KeyValueStore`] under [`SESSION_KEY`] and rehydrated on open without
//! any network round-trip. Every change is broadcast on an [`EventBus`].

use chrono::Utc;
use moodtune_common::events::{EventBus, SessionEvent};
use moodtune_common::models::UserProfile;
use moodtune_common::storage::{get_json, set_json, KeyValueStore};
use moodtune_common::Result;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Storage key of the persisted session blob
pub const SESSION_KEY: &str = "moodtune_auth_v1";

/// Persisted blob shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    user: UserProfile,
    session_id: String,
}

struct Inner {
    store: Arc<dyn KeyValueStore>,
    current: RwLock<Option<StoredSession>>,
    events: EventBus,
}

/// Injectable session store; clones share state
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    /// Open the store and rehydrate any persisted session
    ///
    /// No event is emitted for the rehydrated state; subscribers read it
    /// through [`SessionStore::is_authenticated`] before listening.
    pub fn open(store: Arc<dyn KeyValueStore>) -> Self {
        let current = get_json::<StoredSession>(store.as_ref(), SESSION_KEY)
            .filter(|s| !s.session_id.trim().is_empty());

        if let Some(ref session) = current {
            info!(user_id = %session.user.user_id, "Restored persisted session");
        }

        Self {
            inner: Arc::new(Inner {
                store,
                current: RwLock::new(current),
                events: EventBus::default(),
            }),
        }
    }

    pub fn session_id(&self) -> Option<String> {
        self.read().map(|s| s.session_id)
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.read().map(|s| s.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Replace the active session and persist it
    pub fn set(&self, session_id: String, user: UserProfile) -> Result<()> {
        let session = StoredSession {
            user: user.clone(),
            session_id: session_id.clone(),
        };
        set_json(self.inner.store.as_ref(), SESSION_KEY, &session)?;
        if let Ok(mut guard) = self.inner.current.write() {
            *guard = Some(session);
        }

        debug!(user_id = %user.user_id, "Session stored");
        self.inner.events.emit_lossy(SessionEvent::LoggedIn {
            session_id,
            user,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Drop the active session; memory is cleared even if storage fails
    pub fn clear(&self) -> Result<()> {
        if let Ok(mut guard) = self.inner.current.write() {
            *guard = None;
        }
        let removed = self.inner.store.remove(SESSION_KEY);
        self.inner.events.emit_lossy(SessionEvent::LoggedOut {
            timestamp: Utc::now(),
        });
        removed
    }

    /// Subscribe to session changes
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    fn read(&self) -> Option<StoredSession> {
        self.inner.current.read().ok().and_then(|g| g.clone())
    }
}
