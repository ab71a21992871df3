//! Image upload validation
//!
//! Runs before any network call: the MIME type must start with `image/` and
//! the payload must not exceed [`MAX_IMAGE_BYTES`].

use std::path::Path;
use thiserror::Error;

/// 8 MiB
pub const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Select a valid image.")]
    NotAnImage,

    #[error("Image exceeds 8MB.")]
    TooLarge,

    #[error("Could not read image: {0}")]
    Unreadable(String),
}

/// User-supplied image
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file and sniff its MIME type from the content
    pub fn from_path(path: &Path) -> Result<Self, ValidationError> {
        let bytes = std::fs::read(path).map_err(|e| ValidationError::Unreadable(e.to_string()))?;
        let mime_type = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.mime_type.starts_with("image/") {
            return Err(ValidationError::NotAnImage);
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(ValidationError::TooLarge);
        }
        Ok(())
    }
}
