//! Service health checks
//!
//! Probes all four collaborators concurrently. Failures never propagate; each
//! service ends up as ok, error(message) or not set.

use crate::services::api_client::BackendApi;
use crate::services::fer_client::FerService;
use crate::services::http::{build_http_client, join_url};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ServiceHealth {
    Ok,
    Error(String),
    NotSet,
}

impl ServiceHealth {
    pub fn is_ok(&self) -> bool {
        matches!(self, ServiceHealth::Ok)
    }
}

impl fmt::Display for ServiceHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceHealth::Ok => f.write_str("ok"),
            ServiceHealth::Error(msg) => write!(f, "error ({})", msg),
            ServiceHealth::NotSet => f.write_str("not set"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub api: ServiceHealth,
    pub fer: ServiceHealth,
    pub rag: ServiceHealth,
    pub music: ServiceHealth,
}

impl HealthReport {
    pub fn all_ok(&self) -> bool {
        self.api.is_ok() && self.fer.is_ok() && self.rag.is_ok() && self.music.is_ok()
    }
}

/// `<base>/health`, dropping a trailing `/infer`, `/search` or `/playlist`
pub fn health_url_for(base: &str) -> String {
    let trimmed = base.trim().trim_end_matches('/');
    let root = ["/infer", "/search", "/playlist"]
        .iter()
        .find_map(|suffix| trimmed.strip_suffix(suffix))
        .unwrap_or(trimmed);
    join_url(root, "/health")
}

fn status_is_healthy(status: Option<&str>) -> bool {
    matches!(status, Some("ok") | Some("healthy"))
}

/// Probe a plain `{status}` health endpoint
pub async fn probe(http: &reqwest::Client, base: &str) -> ServiceHealth {
    let url = health_url_for(base);
    debug!(url = %url, "Health probe");
    let response = match http.get(&url).send().await {
        Ok(r) => r,
        Err(e) => return ServiceHealth::Error(e.to_string()),
    };
    if !response.status().is_success() {
        return ServiceHealth::Error(response.status().to_string());
    }
    match response.json::<serde_json::Value>().await {
        Ok(body) if status_is_healthy(body.get("status").and_then(|s| s.as_str())) => {
            ServiceHealth::Ok
        }
        Ok(body) => ServiceHealth::Error(format!("unexpected reply: {}", body)),
        Err(e) => ServiceHealth::Error(e.to_string()),
    }
}

pub async fn check_api(api: &dyn BackendApi) -> ServiceHealth {
    match api.health().await {
        Ok(reply) if status_is_healthy(Some(reply.status.as_str())) => ServiceHealth::Ok,
        Ok(reply) => ServiceHealth::Error(reply.status),
        Err(e) => ServiceHealth::Error(e.to_string()),
    }
}

pub async fn check_fer(fer: &dyn FerService) -> ServiceHealth {
    if !fer.is_configured() {
        return ServiceHealth::NotSet;
    }
    match fer.health().await {
        Ok(true) => ServiceHealth::Ok,
        Ok(false) => ServiceHealth::Error("unhealthy".to_string()),
        Err(e) => ServiceHealth::Error(e.to_string()),
    }
}

/// Check every collaborator at once
pub async fn check_all(
    api: &dyn BackendApi,
    fer: &dyn FerService,
    rag_base: &str,
    music_base: &str,
    timeout: Duration,
) -> HealthReport {
    let http = match build_http_client(timeout) {
        Ok(http) => http,
        Err(e) => {
            let err = ServiceHealth::Error(e.to_string());
            return HealthReport {
                api: check_api(api).await,
                fer: check_fer(fer).await,
                rag: err.clone(),
                music: err,
            };
        }
    };

    let (api, fer, rag, music) = tokio::join!(
        check_api(api),
        check_fer(fer),
        probe(&http, rag_base),
        probe(&http, music_base),
    );
    HealthReport {
        api,
        fer,
        rag,
        music,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_url_strips_operation_suffix() {
        assert_eq!(health_url_for("http://rag:8010/"), "http://rag:8010/health");
        assert_eq!(health_url_for("http://fer/api/infer"), "http://fer/api/health");
        assert_eq!(health_url_for("http://rag/rag/search"), "http://rag/rag/health");
        assert_eq!(health_url_for("http://m/playlist"), "http://m/health");
    }

    #[test]
    fn test_healthy_status_words() {
        assert!(status_is_healthy(Some("ok")));
        assert!(status_is_healthy(Some("healthy")));
        assert!(!status_is_healthy(Some("degraded")));
        assert!(!status_is_healthy(None));
    }

    #[test]
    fn test_display() {
        assert_eq!(ServiceHealth::NotSet.to_string(), "not set");
        assert_eq!(
            ServiceHealth::Error("502 Bad Gateway".to_string()).to_string(),
            "error (502 Bad Gateway)"
        );
    }
}
