//! Image storage collaborator.
//!
//! The server never stores image bytes itself. Uploads go to an external
//! image service through this narrow contract: send the bytes, get back a
//! stable URL to record on the document.

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::config::ImageStoreConfig;

/// Upload folder for user profile images.
pub const PROFILE_FOLDER: &str = "profileImage";

/// Upload folder for product images.
pub const PRODUCT_FOLDER: &str = "productImage";

/// Image formats accepted for upload.
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Errors from the image storage collaborator.
#[derive(Debug, Error)]
pub enum ImageStoreError {
    /// The upload request could not be sent or completed.
    #[error("image upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The image service refused the upload.
    #[error("image upload rejected: {0}")]
    Rejected(String),

    /// The image service answered with an unexpected body.
    #[error("malformed image store response")]
    MalformedResponse,
}

/// Whether a content type is an accepted image format.
#[must_use]
pub fn is_supported_format(content_type: &str) -> bool {
    ALLOWED_CONTENT_TYPES.contains(&content_type)
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Client for the image storage service.
#[derive(Clone)]
pub struct ImageStore {
    client: reqwest::Client,
    api_url: String,
    api_key: SecretString,
}

impl ImageStore {
    /// Create a new image store client.
    #[must_use]
    pub fn new(config: &ImageStoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Upload image bytes, returning the stored image's URL.
    ///
    /// # Errors
    ///
    /// Returns `ImageStoreError::Request` if the request fails,
    /// `ImageStoreError::Rejected` if the service refuses the upload, and
    /// `ImageStoreError::MalformedResponse` if the response body cannot be
    /// understood.
    pub async fn upload(
        &self,
        folder: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ImageStoreError> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_owned())
            .mime_str(content_type)?;

        let form = Form::new()
            .text("folder", folder.to_owned())
            .part("file", part);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageStoreError::Rejected(format!("status {status}")));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|_| ImageStoreError::MalformedResponse)?;

        Ok(body.secure_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_formats() {
        assert!(is_supported_format("image/jpeg"));
        assert!(is_supported_format("image/png"));
        assert!(is_supported_format("image/webp"));
    }

    #[test]
    fn test_unsupported_formats() {
        assert!(!is_supported_format("image/gif"));
        assert!(!is_supported_format("application/pdf"));
        assert!(!is_supported_format("text/html"));
    }
}
