//! Storage for uploaded documents and images.
//!
//! Rows only ever hold the relative path returned by [`FileStorage::store`].

use async_trait::async_trait;
use base64::Engine as _;
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServiceError;
use crate::tracing::{log_error, ErrorKind};

pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Room for the non-file fields of an upload request.
const UPLOAD_FIELDS_BYTES: usize = 64 * 1024;

/// Request body limit for a JSON request carrying up to `files` inline files of
/// at most [`MAX_FILE_BYTES`] each.
pub const fn upload_body_limit(files: usize) -> usize {
    files * MAX_FILE_BYTES.div_ceil(3) * 4 + UPLOAD_FIELDS_BYTES
}

static UNSAFE_FILE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persist `bytes` and return the path to store on the row.
    async fn store(
        &self,
        organization_id: i32,
        folder: &str,
        file_name: &str,
        bytes: Bytes,
    ) -> Result<String, ServiceError>;

    async fn delete(&self, path: &str) -> Result<(), ServiceError>;
}

/// Uploaded file carried inline in a JSON request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct FilePayload {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    /// Standard base64 of the file contents
    pub content_base64: String,
}

impl FilePayload {
    pub fn decode(&self) -> Result<Bytes, ServiceError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(self.content_base64.trim())
            .map_err(|_| {
                ServiceError::ValidationError(format!(
                    "File '{}' is not valid base64",
                    self.file_name
                ))
            })?;
        if bytes.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "File '{}' is empty",
                self.file_name
            )));
        }
        if bytes.len() > MAX_FILE_BYTES {
            return Err(ServiceError::ValidationError(format!(
                "File '{}' exceeds {} bytes",
                self.file_name, MAX_FILE_BYTES
            )));
        }
        Ok(Bytes::from(bytes))
    }
}

pub fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    let cleaned = UNSAFE_FILE_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Writes beneath `<root>/<organization>/<folder>/<uuid>-<name>`.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, ServiceError> {
        let relative = Path::new(relative);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(ServiceError::StorageError(format!(
                "refusing path outside storage root: {}",
                relative.display()
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(
        &self,
        organization_id: i32,
        folder: &str,
        file_name: &str,
        bytes: Bytes,
    ) -> Result<String, ServiceError> {
        let relative = format!(
            "{}/{}/{}-{}",
            organization_id,
            sanitize_file_name(folder),
            Uuid::new_v4(),
            sanitize_file_name(file_name)
        );
        let full_path = self.resolve(&relative)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ServiceError::StorageError(e.to_string()))?;
        }
        tokio::fs::write(&full_path, &bytes)
            .await
            .map_err(|e| ServiceError::StorageError(e.to_string()))?;

        debug!(path = %relative, size = bytes.len(), "stored file");
        Ok(relative)
    }

    async fn delete(&self, path: &str) -> Result<(), ServiceError> {
        let full_path = self.resolve(path)?;
        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServiceError::StorageError(e.to_string())),
        }
    }
}

/// Files written during one operation, removed again if the operation fails.
pub struct StagedFiles {
    storage: Arc<dyn FileStorage>,
    organization_id: i32,
    stored: Vec<String>,
}

impl StagedFiles {
    pub fn new(storage: Arc<dyn FileStorage>, organization_id: i32) -> Self {
        Self {
            storage,
            organization_id,
            stored: Vec::new(),
        }
    }

    pub async fn stage(
        &mut self,
        folder: &str,
        payload: Option<&FilePayload>,
    ) -> Result<Option<String>, ServiceError> {
        let Some(payload) = payload else {
            return Ok(None);
        };
        let bytes = payload.decode()?;
        let path = self
            .storage
            .store(self.organization_id, folder, &payload.file_name, bytes)
            .await?;
        self.stored.push(path.clone());
        Ok(Some(path))
    }

    /// Delete everything staged so far.
    pub async fn rollback(self) {
        for path in &self.stored {
            if let Err(e) = self.storage.delete(path).await {
                log_error(&e, ErrorKind::Storage, &format!("removing staged file {path}"));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }
}

/// Best-effort removal of files replaced by a committed update.
pub async fn remove_replaced(storage: &dyn FileStorage, paths: Vec<String>) {
    for path in paths {
        if let Err(e) = storage.delete(&path).await {
            log_error(&e, ErrorKind::Storage, &format!("removing replaced file {path}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use rstest::rstest;

    fn payload(name: &str, content: &[u8]) -> FilePayload {
        FilePayload {
            file_name: name.to_string(),
            content_base64: base64::engine::general_purpose::STANDARD.encode(content),
        }
    }

    #[rstest]
    #[case("../../etc/passwd", "passwd")]
    #[case("invoice march 2024.pdf", "invoice_march_2024.pdf")]
    #[case("...", "file")]
    #[case("", "file")]
    #[case("photo (1).JPG", "photo_1_.JPG")]
    fn file_names_are_sanitized(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(sanitize_file_name(raw), expected);
    }

    proptest! {
        #[test]
        fn sanitized_names_are_single_safe_segments(raw in ".*") {
            let name = sanitize_file_name(&raw);
            prop_assert!(!name.is_empty());
            prop_assert!(name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')));
            prop_assert!(!name.starts_with('.'));
        }
    }

    #[test]
    fn invalid_base64_is_a_validation_error() {
        let bad = FilePayload {
            file_name: "x.png".into(),
            content_base64: "***".into(),
        };
        assert_matches!(bad.decode(), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn largest_accepted_file_fits_the_body_limit() {
        let largest = payload("scan.pdf", &vec![7u8; MAX_FILE_BYTES]);
        assert_eq!(largest.decode().unwrap().len(), MAX_FILE_BYTES);
        assert!(largest.content_base64.len() < upload_body_limit(1));
        assert!(4 * largest.content_base64.len() < upload_body_limit(4));

        let oversized = payload("scan.pdf", &vec![7u8; MAX_FILE_BYTES + 1]);
        assert!(oversized.content_base64.len() < upload_body_limit(1));
        assert_matches!(
            oversized.decode(),
            Err(ServiceError::ValidationError(ref msg)) if msg.contains("exceeds")
        );
    }

    #[tokio::test]
    async fn store_and_delete_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        let path = storage
            .store(7, "assets", "photo.png", Bytes::from_static(b"png"))
            .await
            .unwrap();
        assert!(path.starts_with("7/assets/"));
        assert!(path.ends_with("-photo.png"));
        assert!(dir.path().join(&path).exists());

        storage.delete(&path).await.unwrap();
        assert!(!dir.path().join(&path).exists());
        // Deleting twice is not an error.
        storage.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn delete_refuses_parent_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        assert_matches!(
            storage.delete("../outside.txt").await,
            Err(ServiceError::StorageError(_))
        );
    }

    #[tokio::test]
    async fn rollback_removes_staged_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(dir.path()));
        let mut staged = StagedFiles::new(storage, 3);

        let path = staged
            .stage("suppliers", Some(&payload("contract.pdf", b"%PDF")))
            .await
            .unwrap()
            .unwrap();
        assert!(staged.stage("suppliers", None).await.unwrap().is_none());
        assert!(dir.path().join(&path).exists());

        staged.rollback().await;
        assert!(!dir.path().join(&path).exists());
    }
}
