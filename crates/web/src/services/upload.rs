//! Picture storage for place uploads.
//!
//! Pictures go to Cloudinary when it is configured and to a local directory
//! served under `/uploads` otherwise. Either way the store hands back the URL
//! that is saved on the place.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::{CloudinaryConfig, UploadConfig};

/// URL prefix that local uploads are served under.
pub const LOCAL_UPLOADS_PATH: &str = "/uploads";

/// Errors from validating or storing a picture.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The file is not one of the accepted image types.
    #[error("unsupported picture type: {0}")]
    UnsupportedType(String),

    /// The file is larger than the configured limit.
    #[error("picture is too large (max {max} bytes)")]
    TooLarge { max: usize },

    /// Writing to the upload directory failed.
    #[error("could not write picture: {0}")]
    Io(#[from] std::io::Error),

    /// The Cloudinary request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Cloudinary rejected the upload.
    #[error("upload rejected: {0}")]
    Rejected(String),
}

impl UploadError {
    /// Whether the error came from the submitted file rather than the backend.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::UnsupportedType(_) | Self::TooLarge { .. })
    }
}

/// Image formats accepted for place pictures, by MIME type and extension.
const ACCEPTED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/avif", "avif"),
];

/// A validated picture taken from a multipart form.
#[derive(Debug, Clone)]
pub struct PictureUpload {
    content_type: &'static str,
    extension: &'static str,
    bytes: Vec<u8>,
}

impl PictureUpload {
    /// Validate an uploaded file.
    ///
    /// Returns `Ok(None)` for an empty file field (no file chosen).
    ///
    /// # Errors
    ///
    /// Returns `UploadError::UnsupportedType` for non-image content and
    /// `UploadError::TooLarge` when the file exceeds `max_bytes`.
    pub fn new(
        content_type: Option<&str>,
        bytes: Vec<u8>,
        max_bytes: usize,
    ) -> Result<Option<Self>, UploadError> {
        if bytes.is_empty() {
            return Ok(None);
        }
        if bytes.len() > max_bytes {
            return Err(UploadError::TooLarge { max: max_bytes });
        }

        let declared = content_type
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
            .unwrap_or_default();
        let declared = if declared == "image/jpg" {
            "image/jpeg".to_owned()
        } else {
            declared
        };

        let (content_type, extension) = ACCEPTED_TYPES
            .iter()
            .copied()
            .find(|(mime, _)| *mime == declared)
            .ok_or(UploadError::UnsupportedType(declared))?;

        Ok(Some(Self {
            content_type,
            extension,
            bytes,
        }))
    }

    /// Normalized MIME type.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// File extension matching the MIME type.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        self.extension
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; empty uploads are rejected by [`PictureUpload::new`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Somewhere pictures can be stored.
#[async_trait]
pub trait PictureStore: Send + Sync {
    /// Store a picture and return the URL to display it from.
    async fn store(&self, picture: PictureUpload) -> Result<String, UploadError>;
}

/// Build the picture store selected by configuration.
#[must_use]
pub fn picture_store(config: &UploadConfig) -> Arc<dyn PictureStore> {
    match &config.cloudinary {
        Some(cloudinary) => {
            tracing::info!(cloud = %cloudinary.cloud_name, "Storing pictures on Cloudinary");
            Arc::new(CloudinaryStore::new(cloudinary))
        }
        None => {
            tracing::info!(dir = %config.dir.display(), "Storing pictures on local disk");
            Arc::new(LocalDiskStore::new(config.dir.clone()))
        }
    }
}

// =============================================================================
// Local disk
// =============================================================================

/// Stores pictures in a directory served at [`LOCAL_UPLOADS_PATH`].
pub struct LocalDiskStore {
    dir: PathBuf,
}

impl LocalDiskStore {
    /// Create a store writing into `dir`.
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl PictureStore for LocalDiskStore {
    async fn store(&self, picture: PictureUpload) -> Result<String, UploadError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let file_name = format!("{}.{}", uuid::Uuid::new_v4(), picture.extension);
        tokio::fs::write(self.dir.join(&file_name), &picture.bytes).await?;

        tracing::debug!(file = %file_name, bytes = picture.len(), "Stored picture locally");
        Ok(format!("{LOCAL_UPLOADS_PATH}/{file_name}"))
    }
}

// =============================================================================
// Cloudinary
// =============================================================================

/// Stores pictures with Cloudinary's signed upload API.
pub struct CloudinaryStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_secret: SecretString,
    folder: String,
}

#[derive(Deserialize)]
struct CloudinaryResponse {
    secure_url: Option<String>,
    error: Option<CloudinaryErrorBody>,
}

#[derive(Deserialize)]
struct CloudinaryErrorBody {
    message: String,
}

impl CloudinaryStore {
    /// Create a Cloudinary store.
    #[must_use]
    pub fn new(config: &CloudinaryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!(
                "https://api.cloudinary.com/v1_1/{}/image/upload",
                config.cloud_name
            ),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            folder: config.folder.clone(),
        }
    }
}

/// Sign upload parameters: sorted `key=value` pairs joined with `&`, the API
/// secret appended, SHA-256, lowercase hex.
fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_unstable_by_key(|(key, _)| *key);

    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl PictureStore for CloudinaryStore {
    async fn store(&self, picture: PictureUpload) -> Result<String, UploadError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", &self.folder), ("timestamp", &timestamp)],
            self.api_secret.expose_secret(),
        );

        let size = picture.len();
        let file = Part::bytes(picture.bytes)
            .file_name(format!("picture.{}", picture.extension))
            .mime_str(picture.content_type)?;

        let form = Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", self.folder.clone())
            .text("signature_algorithm", "sha256")
            .text("signature", signature)
            .part("file", file);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body: CloudinaryResponse = response.json().await?;

        match (body.secure_url, body.error) {
            (Some(url), _) if status.is_success() => {
                tracing::debug!(bytes = size, "Stored picture on Cloudinary");
                Ok(url)
            }
            (_, Some(error)) => {
                tracing::error!(status = %status, message = %error.message, "Cloudinary upload failed");
                Err(UploadError::Rejected(error.message))
            }
            _ => Err(UploadError::Rejected(format!("HTTP {status}"))),
        }
    }
}
