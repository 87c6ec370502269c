//! Upload manager
//!
//! Validates and stores uploaded images, and deletes superseded files.
//! Deletion is fire-and-forget: it is spawned, never awaited by the request,
//! and failures are only logged.

use std::path::{Path, PathBuf};

use anyhow::Result;
use uuid::Uuid;

use crate::error::{ApiError, FieldError};

/// URL prefix under which stored files are served.
const URL_PREFIX: &str = "uploads";

pub struct UploadService {
    root: PathBuf,
}

impl UploadService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the upload directory if it does not exist yet
    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Whether the upload directory is present on disk
    pub fn root_exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Validate and store one uploaded image, returning its URL path.
    ///
    /// The payload is sniffed with `infer`; the declared content type is only
    /// a fallback for formats the sniffer does not know. Non-images are
    /// rejected before anything touches disk.
    pub async fn store_image(
        &self,
        original_name: &str,
        declared_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, ApiError> {
        if !is_image(bytes, declared_type) {
            return Err(ApiError::validation(
                "Validation failed, form data is incorrect!",
                vec![FieldError::new("image", "Only image uploads are allowed.")],
            ));
        }

        let file_name = stored_file_name(original_name, bytes);
        let path = self.root.join(&file_name);

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("Failed to store upload: {e}")))?;

        tracing::debug!(file = %file_name, size = bytes.len(), "image stored");
        Ok(format!("{URL_PREFIX}/{file_name}"))
    }

    /// Resolve a stored URL path back to a file on disk. Only the final path
    /// component is used, so a crafted reference cannot escape the upload
    /// directory.
    pub fn resolve_stored(&self, image_url: &str) -> Option<PathBuf> {
        let name = Path::new(image_url).file_name()?;
        Some(self.root.join(name))
    }

    /// Delete a previously stored file, best-effort. Never blocks or fails
    /// the calling request.
    pub fn delete_stored(&self, image_url: &str) {
        let Some(path) = self.resolve_stored(image_url) else {
            tracing::warn!(image_url, "cannot resolve stored file for deletion");
            return;
        };

        tokio::spawn(async move {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %e, "failed to delete stored file");
            }
        });
    }
}

fn is_image(bytes: &[u8], declared_type: Option<&str>) -> bool {
    if let Some(kind) = infer::get(bytes) {
        return kind.matcher_type() == infer::MatcherType::Image;
    }
    declared_type.is_some_and(|t| t.starts_with("image/"))
}

/// Unique stored name: uuid prefix plus the sanitized client file name, or a
/// sniffed extension when the client name is unusable.
fn stored_file_name(original_name: &str, bytes: &[u8]) -> String {
    let id = Uuid::new_v4();
    let sanitized = sanitize_filename::sanitize(original_name);
    if sanitized.is_empty() {
        let ext = infer::get(bytes).map(|k| k.extension()).unwrap_or("bin");
        format!("{id}.{ext}")
    } else {
        format!("{id}-{sanitized}")
    }
}
