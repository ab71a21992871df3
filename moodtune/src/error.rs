//! Error type for collaborator calls
//!
//! Every HTTP client in [`crate::services`] reports failures as a
//! [`ServiceError`]. Flow-level modules wrap it in their own error enums.

use thiserror::Error;

/// Collaborator call failure
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Connection refused, DNS failure, TLS error, client-side timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx reply; `message` is the server-provided text when available
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Reply body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Endpoint missing from configuration
    #[error("{0} endpoint not configured")]
    NotConfigured(&'static str),

    /// Caller cancelled the in-flight request
    #[error("Request aborted")]
    Aborted,

    /// Configured URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Request rejected locally before anything was sent
    #[error("Invalid request: {0}")]
    InvalidInput(String),
}

impl ServiceError {
    /// HTTP status for [`ServiceError::Api`]
    pub fn status(&self) -> Option<u16> {
        match self {
            ServiceError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Parse(err.to_string())
        } else {
            ServiceError::Network(err.to_string())
        }
    }
}

/// Result type for collaborator calls
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Startup failure while wiring the application context
#[derive(Debug, Error)]
pub enum InitError {
    #[error("{0}")]
    Common(#[from] moodtune_common::Error),

    #[error("{0}")]
    Service(#[from] ServiceError),
}
