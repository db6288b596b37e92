//! Storage for uploaded article images.

use axum::body::Bytes;
use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::database::store::new_id;
use crate::error::ApiError;

/// URL prefix (and relative directory) uploaded files are served from
pub const PUBLIC_PREFIX: &str = "uploads";

/// A file part received in a multipart request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// A file written to the upload directory
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub disk_path: PathBuf,
    /// Server-relative path clients fetch the file from
    pub public_path: String,
}

impl UploadedFile {
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false)
    }
}

/// Write an image into `dir` under a timestamped, sanitised name. A fresh id
/// keeps same-named uploads in the same millisecond apart.
pub async fn save(dir: &Path, file: &UploadedFile) -> Result<StoredUpload, ApiError> {
    if !file.is_image() {
        return Err(ApiError::bad_request("Only image files can be uploaded"));
    }

    let stored_name = format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        new_id(),
        sanitize_file_name(&file.file_name)
    );

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ApiError::internal_server_error(format!("Failed to create upload dir: {e}")))?;

    let disk_path = dir.join(&stored_name);
    tokio::fs::write(&disk_path, &file.bytes)
        .await
        .map_err(|e| ApiError::internal_server_error(format!("Failed to store upload: {e}")))?;

    let relative = Path::new(PUBLIC_PREFIX).join(&stored_name);
    Ok(StoredUpload {
        disk_path,
        public_path: image_path(&relative.to_string_lossy()),
    })
}

/// Best-effort removal of an upload whose record was never persisted
pub async fn discard(upload: &StoredUpload) {
    if let Err(e) = tokio::fs::remove_file(&upload.disk_path).await {
        tracing::warn!(path = %upload.disk_path.display(), "failed to remove orphaned upload: {}", e);
    }
}

/// Stored image paths use `/` for the first separator only; later
/// separators are kept as the platform produced them.
pub fn image_path(raw: &str) -> String {
    raw.replacen('\\', "/", 1)
}

/// Keep ASCII alphanumerics, `.`, `-` and `_`; anything else becomes `-`.
/// Directory components of the client-supplied name are dropped.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '-' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
