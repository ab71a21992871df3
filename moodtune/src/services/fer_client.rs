//! Facial emotion recognition client
//!
//! `POST <endpoint>` with a multipart `image` field. The call races the
//! caller's cancellation token so a timeout can abort it mid-flight.

use crate::detection::upload::ImageUpload;
use crate::error::{ServiceError, ServiceResult};
use crate::services::http::{build_http_client, read_json};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Raw classifier reply; the label is validated by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FerResponse {
    pub emotion: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub model_version: Option<String>,
}

#[async_trait]
pub trait FerService: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn infer(&self, image: &ImageUpload, cancel: CancellationToken)
        -> ServiceResult<FerResponse>;

    /// True when the health endpoint answers `{"status":"ok"}`
    async fn health(&self) -> ServiceResult<bool>;
}

/// Derive the health URL from the inference endpoint
///
/// `.../infer` becomes `.../health`; anything else maps to `<origin>/health`.
pub fn fer_health_url(endpoint: &str) -> Option<String> {
    let trimmed = endpoint.trim();
    if let Some(prefix) = trimmed.strip_suffix("/infer") {
        return Some(format!("{}/health", prefix));
    }

    let url = reqwest::Url::parse(trimmed).ok()?;
    let host = url.host_str()?;
    let origin = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    };
    Some(format!("{}/health", origin))
}

pub struct FerClient {
    http: reqwest::Client,
    endpoint: Option<String>,
}

impl FerClient {
    pub fn new(endpoint: Option<String>, timeout: Duration) -> ServiceResult<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
        })
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

#[async_trait]
impl FerService for FerClient {
    fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    async fn infer(
        &self,
        image: &ImageUpload,
        cancel: CancellationToken,
    ) -> ServiceResult<FerResponse> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or(ServiceError::NotConfigured("FER"))?;

        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(|e| ServiceError::Parse(e.to_string()))?;
        let form = Form::new().part("image", part);

        debug!(
            endpoint = %endpoint,
            bytes = image.bytes.len(),
            "Sending image to FER"
        );

        let call = async {
            let response = self.http.post(endpoint).multipart(form).send().await?;
            read_json::<FerResponse>(response).await
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ServiceError::Aborted),
            result = call => result,
        }
    }

    async fn health(&self) -> ServiceResult<bool> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or(ServiceError::NotConfigured("FER"))?;
        let url = fer_health_url(endpoint)
            .ok_or_else(|| ServiceError::InvalidUrl(endpoint.to_string()))?;

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Ok(false);
        }
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        Ok(body.get("status").and_then(|s| s.as_str()) == Some("ok"))
    }
}
