//! Backend REST resource types
//!
//! Response types are lenient (optional fields default to `None`) because the
//! backend omits unset columns. Request bodies skip `None` fields so PATCH
//! requests only carry what the caller set.

use super::emotion::{ActorType, Emotion, Intention, MusicProvider};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ========================================
// Login
// ========================================

/// Credentials for `POST /sessions/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_hash: Option<String>,
}

/// Minimal user profile returned by login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub session_id: String,
    pub user: UserProfile,
}

/// `GET /health` reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

// ========================================
// Pagination and acknowledgements
// ========================================

/// Paginated list envelope used by every list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateAck {
    #[serde(default)]
    pub updated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteAck {
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

// ========================================
// Users
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_hash: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserCreate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_hash: Option<String>,
}

pub type UserUpdate = UserCreate;

// ========================================
// Sessions
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub device_info: Option<String>,
    #[serde(default)]
    pub ip_hash: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub ended_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionCreate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
}

// ========================================
// Inferences
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inference {
    pub inference_id: String,
    pub session_id: String,
    pub emotion: Emotion,
    pub confidence: f64,
    #[serde(default)]
    pub intention: Option<Intention>,
    #[serde(default)]
    pub latency_ms: Option<u64>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceCreate {
    pub session_id: String,
    pub emotion: Emotion,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention: Option<Intention>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<Emotion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention: Option<Intention>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

// ========================================
// Playlists (reference records)
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub playlist_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub provider: Option<MusicProvider>,
    #[serde(default)]
    pub external_playlist_id: Option<String>,
    #[serde(default)]
    pub deep_link_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistCreate {
    pub user_id: String,
    pub provider: MusicProvider,
    pub external_playlist_id: String,
    pub deep_link_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylistUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<MusicProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_playlist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_link_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ========================================
// Mood map rules
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodMapRule {
    pub rule_id: String,
    pub emotion: Emotion,
    pub intention: Intention,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub params_json: Option<Value>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub valid_from: Option<String>,
    #[serde(default)]
    pub valid_to: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodMapRuleCreate {
    pub emotion: Emotion,
    pub intention: Intention,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    pub params_json: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoodMapRuleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<Emotion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention: Option<Intention>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params_json: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<String>,
}

// ========================================
// Audit logs
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub audit_id: i64,
    pub actor_type: ActorType,
    #[serde(default)]
    pub actor_id: Option<String>,
    pub action: String,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub payload_json: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogCreate {
    pub actor_type: ActorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_json: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLogUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_type: Option<ActorType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_json: Option<Value>,
}

// ========================================
// OAuth tokens
// ========================================

/// Stored provider token record (ciphertexts are never returned)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    pub token_id: String,
    pub user_id: String,
    pub provider: MusicProvider,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokenUpsert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    pub user_id: String,
    pub provider: MusicProvider,
    pub access_cipher_b64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_cipher_b64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthTokenUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<MusicProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_cipher_b64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_cipher_b64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// `GET /oauth-tokens/valid/{user_id}/{provider}` reply
///
/// The backend decrypts, refreshes if needed, and persists the new token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub was_refreshed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_body_skips_unset_fields() {
        let body = PlaylistUpdate {
            title: Some("Rainy day".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "title": "Rainy day" }));
    }

    #[test]
    fn test_paginated_tolerates_missing_counters() {
        let page: Paginated<User> =
            serde_json::from_str(r#"{"items":[{"user_id":"u1"}]}"#).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.limit, 0);
        assert!(page.items[0].display_name.is_none());
    }

    #[test]
    fn test_inference_create_wire_shape() {
        let body = InferenceCreate {
            session_id: "s-1".to_string(),
            emotion: Emotion::Sadness,
            confidence: 0.87,
            intention: Some(Intention::Change),
            latency_ms: None,
            model_version: Some("local-fallback-0.1".to_string()),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["emotion"], "sadness");
        assert_eq!(json["intention"], "change");
        assert!(json.get("latency_ms").is_none());
    }

    #[test]
    fn test_valid_token_defaults_not_refreshed() {
        let token: ValidTokenResponse =
            serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        assert!(!token.was_refreshed);
        assert!(token.expires_at.is_none());
    }
}
