//! Session & Provider Connect Integration Tests
//! Test File: auth_session_tests.rs

mod helpers;

use helpers::{profile, FakeBackend, FakeMusic};
use moodtune::auth::{
    AuthError, AuthSession, ConnectError, LogoutOutcome, OAuthCallback, ProviderConnect,
    SessionStore, TokenManager, OAUTH_STATE_KEY, SESSION_KEY, TOKEN_METADATA_KEY,
};
use moodtune::AppContext;
use moodtune_common::config::Settings;
use moodtune_common::events::SessionEvent;
use moodtune_common::storage::{JsonFileStore, KeyValueStore, MemoryStore};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn login_persists_session_across_restarts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("storage.json");
    let backend = Arc::new(FakeBackend::with_login("sess-42", "u-7"));

    // Given: a successful login
    {
        let store = SessionStore::open(Arc::new(JsonFileStore::open(&path)));
        let auth = AuthSession::new(backend.clone(), store);
        let user = auth.login("  someone@example.com ", "secret").await.unwrap();
        assert_eq!(user.user_id, "u-7");
        assert!(auth.is_authenticated());
        assert!(!auth.is_logging_in());
    }

    // When: the store is reopened
    let store = SessionStore::open(Arc::new(JsonFileStore::open(&path)));

    // Then: the session is restored without another network call
    assert_eq!(store.session_id().as_deref(), Some("sess-42"));
    assert_eq!(store.user().map(|u| u.user_id).as_deref(), Some("u-7"));
    assert_eq!(backend.logins.load(Ordering::SeqCst), 1);

    // And: the rehydrated state is read directly, not replayed as an event
    let mut events = store.subscribe();
    assert!(store.is_authenticated());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn login_rejects_blank_credentials_without_calling_backend() {
    let backend = Arc::new(FakeBackend::default());
    let auth = AuthSession::new(backend.clone(), SessionStore::open(Arc::new(MemoryStore::new())));

    let err = auth.login("   ", "pw").await.unwrap_err();
    assert!(matches!(err, AuthError::MissingCredentials));
    let err = auth.login("a@b.c", "").await.unwrap_err();
    assert!(matches!(err, AuthError::MissingCredentials));
    assert_eq!(backend.logins.load(Ordering::SeqCst), 0);

    // Backend rejection surfaces its message and leaves no session behind
    let err = auth.login("a@b.c", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid credentials");
    assert!(!auth.is_authenticated());
    assert!(!auth.is_logging_in());
}

#[tokio::test]
async fn abandoned_login_does_not_block_the_next_one() {
    // Given: a backend slow enough that the caller gives up
    let mut backend = FakeBackend::with_login("sess-5", "u-5");
    backend.login_delay = Some(Duration::from_secs(30));
    let backend = Arc::new(backend);
    let auth = AuthSession::new(backend.clone(), SessionStore::open(Arc::new(MemoryStore::new())));

    let abandoned = tokio::time::timeout(Duration::from_millis(50), auth.login("a@b.c", "pw")).await;
    assert!(abandoned.is_err());

    // Then: the in-progress flag was released with the dropped call
    assert!(!auth.is_logging_in());
    let again = tokio::time::timeout(Duration::from_millis(50), auth.login("a@b.c", "pw")).await;
    assert!(again.is_err(), "second attempt should reach the backend, not fail as busy");
    assert_eq!(backend.logins.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn logout_clears_locally_even_when_remote_delete_fails() {
    let backend = Arc::new(FakeBackend {
        fail_delete: true,
        ..Default::default()
    });
    let raw = Arc::new(MemoryStore::new());
    let store = SessionStore::open(raw.clone());
    store.set("sess-1".to_string(), profile("u-1")).unwrap();
    let mut events = store.subscribe();
    let auth = AuthSession::new(backend.clone(), store);

    let outcome = auth.logout().await;

    assert!(matches!(outcome, LogoutOutcome::RemoteDeleteFailed(_)));
    assert!(!auth.is_authenticated());
    assert!(raw.get(SESSION_KEY).is_none());
    assert_eq!(backend.deleted(), vec!["sess-1".to_string()]);
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedOut { .. }
    ));

    // Second logout has nothing to delete
    assert_eq!(auth.logout().await, LogoutOutcome::NoSession);
    assert_eq!(backend.deleted().len(), 1);
}

#[tokio::test]
async fn blank_persisted_session_is_treated_as_absent() {
    let raw = Arc::new(MemoryStore::new());
    raw.set(
        SESSION_KEY,
        r#"{"user":{"user_id":"u-1"},"sessionId":"  "}"#.to_string(),
    )
    .unwrap();

    let store = SessionStore::open(raw);
    assert!(!store.is_authenticated());
}

fn connect_fixture(
    logged_in: bool,
) -> (ProviderConnect, Arc<FakeBackend>, Arc<MemoryStore>, Arc<TokenManager>) {
    let backend = Arc::new(FakeBackend::default());
    let music = Arc::new(FakeMusic {
        auth_state: "state-123".to_string(),
        ..Default::default()
    });
    let scoped = Arc::new(MemoryStore::new());
    let session = SessionStore::open(Arc::new(MemoryStore::new()));
    if logged_in {
        session.set("sess-1".to_string(), profile("u-1")).unwrap();
    }
    let tokens = Arc::new(TokenManager::new(backend.clone(), scoped.clone()));
    let connect = ProviderConnect::new(music, backend.clone(), session, tokens.clone(), scoped.clone());
    (connect, backend, scoped, tokens)
}

fn callback(state: &str) -> OAuthCallback {
    OAuthCallback {
        access_token: "acc".to_string(),
        refresh_token: Some("ref".to_string()),
        expires_in: Some(3600),
        state: state.to_string(),
    }
}

#[tokio::test]
async fn connect_state_mismatch_is_rejected_and_cleared() {
    let (connect, backend, scoped, tokens) = connect_fixture(true);

    let auth = connect.begin("http://localhost:8899/callback").await.unwrap();
    assert_eq!(auth.state, "state-123");
    assert_eq!(scoped.get(OAUTH_STATE_KEY).as_deref(), Some("state-123"));

    let err = connect.complete(callback("forged")).await.unwrap_err();

    assert!(matches!(err, ConnectError::StateMismatch));
    assert!(connect.pending_state().is_none());
    assert!(backend.upserts.lock().unwrap().is_empty());
    assert!(!tokens.is_connected());
}

#[tokio::test]
async fn connect_complete_stores_encoded_tokens() {
    let (connect, backend, scoped, tokens) = connect_fixture(true);
    connect.begin("http://localhost:8899/callback").await.unwrap();

    let meta = connect.complete(callback("state-123")).await.unwrap();

    let upserts = backend.upserts.lock().unwrap().clone();
    assert_eq!(upserts.len(), 1);
    assert_eq!(upserts[0].user_id, "u-1");
    assert_eq!(upserts[0].access_cipher_b64, "YWNj");
    assert_eq!(upserts[0].refresh_cipher_b64.as_deref(), Some("cmVm"));
    assert_eq!(upserts[0].expires_at.as_deref(), Some(meta.expires_at.as_str()));

    assert_eq!(meta.token_id, "tok-1");
    assert!(tokens.is_connected());
    assert!(scoped.get(OAUTH_STATE_KEY).is_none());
    assert!(scoped.get(TOKEN_METADATA_KEY).is_some());

    connect.disconnect().unwrap();
    assert!(!tokens.is_connected());
}

#[tokio::test]
async fn connect_code_exchange_goes_through_music_service() {
    let (connect, backend, _scoped, tokens) = connect_fixture(true);
    connect.begin("http://localhost:8899/callback").await.unwrap();

    let meta = connect.complete_with_code("the-code", "state-123").await.unwrap();

    assert_eq!(meta.access_token, "access-for-the-code");
    assert_eq!(backend.upserts.lock().unwrap().len(), 1);
    assert!(tokens.is_connected());
}

#[tokio::test]
async fn connect_requires_login() {
    let (connect, backend, _scoped, _tokens) = connect_fixture(false);
    connect.begin("http://localhost:8899/callback").await.unwrap();

    let err = connect.complete(callback("state-123")).await.unwrap_err();

    assert!(matches!(err, ConnectError::NotAuthenticated));
    assert!(backend.upserts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn app_logout_drops_scoped_data() {
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        api_base_url: "http://127.0.0.1:9".to_string(),
        api_bearer_token: None,
        fer_endpoint_url: None,
        rag_base_url: "http://127.0.0.1:9".to_string(),
        music_base_url: "http://127.0.0.1:9".to_string(),
        data_dir: dir.path().to_path_buf(),
        detection_timeout_ms: 1_000,
        request_timeout_secs: 1,
        log_level: "info".to_string(),
    };
    let persistent = Arc::new(MemoryStore::new());
    let scoped = Arc::new(MemoryStore::new());
    let ctx = AppContext::with_stores(settings, persistent, scoped.clone()).unwrap();

    scoped.set(TOKEN_METADATA_KEY, "{}".to_string()).unwrap();
    scoped.set(OAUTH_STATE_KEY, "s".to_string()).unwrap();

    assert_eq!(ctx.logout().await, LogoutOutcome::NoSession);
    assert!(scoped.get(TOKEN_METADATA_KEY).is_none());
    assert!(scoped.get(OAUTH_STATE_KEY).is_none());
}
