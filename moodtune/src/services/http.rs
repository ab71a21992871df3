//! Shared HTTP plumbing for the collaborator clients
//!
//! Centralizes client construction, URL building and the non-2xx
//! normalization rule: a JSON body with a string `error` field wins, then the
//! raw body text, then `"<status> <reason>"`.

use crate::error::{ServiceError, ServiceResult};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const USER_AGENT: &str = concat!("MoodTune/", env!("CARGO_PKG_VERSION"));

/// Build a reqwest client with the shared user agent and timeout
pub fn build_http_client(timeout: Duration) -> ServiceResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ServiceError::Network(e.to_string()))
}

/// Join a base URL and an absolute path without doubling slashes
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Percent-encode one path segment
pub fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Turn a failed response into a [`ServiceError::Api`]
pub async fn error_from_response(response: Response) -> ServiceError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ServiceError::Api {
        status: status.as_u16(),
        message: error_message(status, &body),
    }
}

/// Extract the user-facing message for a failed reply
pub fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = value.get("error").and_then(|e| e.as_str()) {
            if !msg.trim().is_empty() {
                return msg.to_string();
            }
        }
    }

    let text = body.trim();
    if !text.is_empty() {
        return text.to_string();
    }

    format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    )
    .trim_end()
    .to_string()
}

/// Decode a JSON reply, normalizing non-2xx statuses
pub async fn read_json<T: DeserializeOwned>(response: Response) -> ServiceResult<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ServiceError::Parse(e.to_string()))
}

/// Decode a JSON reply where 204 (or an empty body) means the default value
pub async fn read_json_or_default<T: DeserializeOwned + Default>(
    response: Response,
) -> ServiceResult<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    if response.status() == StatusCode::NO_CONTENT {
        return Ok(T::default());
    }

    let bytes = response.bytes().await?;
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(T::default());
    }

    serde_json::from_slice(&bytes).map_err(|e| ServiceError::Parse(e.to_string()))
}
