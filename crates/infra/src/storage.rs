//! # File storage
//!
//! Uploaded documents and avatars are written under a configured root
//! directory. Stored files are addressed by a storage-relative URL of
//! the form `/uploads/{uuid}_{sanitized-name}`.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use uuid::Uuid;

use crate::error::InfraError;

/// Upload size cap in bytes (50 MB).
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Result of a successful save.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub url:       String,
    pub file_type: String,
    pub file_size: i64,
}

pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes `content` under the storage root and returns its URL.
    ///
    /// Rejects payloads over [`MAX_UPLOAD_SIZE`]. The original file name
    /// is kept in the stored name for readability but prefixed with a
    /// UUID so collisions cannot occur.
    pub async fn save(&self, file_name: &str, content: Bytes) -> Result<StoredFile, InfraError> {
        if content.len() > MAX_UPLOAD_SIZE {
            return Err(InfraError::invalid_input(format!(
                "file exceeds upload limit: {} bytes",
                content.len()
            )));
        }

        let sanitized = sanitize_file_name(file_name);
        let stored_name = format!("{}_{sanitized}", Uuid::now_v7());
        let path = self.root.join(&stored_name);

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, &content).await?;

        Ok(StoredFile {
            url:       format!("/uploads/{stored_name}"),
            file_type: file_extension(&sanitized),
            file_size: content.len() as i64,
        })
    }

    /// Removes a stored file by its URL. Missing files are not an error:
    /// deletion is best-effort cleanup after the database row is gone.
    pub async fn delete(&self, url: &str) {
        let Some(stored_name) = url.strip_prefix("/uploads/") else {
            tracing::warn!(url, "not a storage url, skipping delete");
            return;
        };
        let path = self.root.join(stored_name);
        if let Err(e) = tokio::fs::remove_file(&path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(url, error = %e, "failed to delete stored file");
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Keeps only characters safe for a flat file name.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() { "file".to_owned() } else { cleaned }
}

fn file_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_sanitize_strips_path_separators() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("отчет 2025.pdf"), "отчет_2025.pdf");
        assert_eq!(sanitize_file_name(""), "file");
    }

    #[test]
    fn test_file_extension_lowercased() {
        assert_eq!(file_extension("report.PDF"), "pdf");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("noext"), "");
    }

    #[tokio::test]
    async fn test_save_and_delete_round_trip() {
        let dir = std::env::temp_dir().join(format!("declarant-test-{}", Uuid::now_v7()));
        let storage = LocalFileStorage::new(&dir);

        let stored = storage
            .save("contract.pdf", Bytes::from_static(b"content"))
            .await
            .unwrap();
        assert!(stored.url.starts_with("/uploads/"));
        assert_eq!(stored.file_type, "pdf");
        assert_eq!(stored.file_size, 7);

        let name = stored.url.strip_prefix("/uploads/").unwrap();
        assert!(dir.join(name).exists());

        storage.delete(&stored.url).await;
        assert!(!dir.join(name).exists());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn test_save_rejects_oversized_payload() {
        let dir = std::env::temp_dir().join(format!("declarant-test-{}", Uuid::now_v7()));
        let storage = LocalFileStorage::new(&dir);

        let oversized = Bytes::from(vec![0u8; MAX_UPLOAD_SIZE + 1]);
        let result = storage.save("big.bin", oversized).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_ok() {
        let storage = LocalFileStorage::new("/tmp/declarant-nonexistent");
        storage.delete("/uploads/missing.txt").await;
    }
}
