//! Path-addressed blob storage for uploaded materials
//!
//! Paths are relative, `/`-separated and may not escape the store root.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Invalid blob path: {0}")]
    InvalidPath(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Blob I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path`, replacing any existing blob
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), BlobError>;

    async fn get(&self, path: &str) -> Result<Vec<u8>, BlobError>;

    /// Delete the blob at `path`; returns whether it existed
    async fn delete(&self, path: &str) -> Result<bool, BlobError>;
}

/// Check a blob path and split it into segments
pub fn validate_blob_path(path: &str) -> Result<Vec<&str>, BlobError> {
    if path.is_empty() || path.starts_with('/') || path.contains('\\') {
        return Err(BlobError::InvalidPath(path.to_string()));
    }

    let segments: Vec<&str> = path.split('/').collect();
    let valid = segments
        .iter()
        .all(|s| !s.is_empty() && *s != "." && *s != ".." && !s.contains(':') && !s.contains('\0'));
    if !valid {
        return Err(BlobError::InvalidPath(path.to_string()));
    }

    Ok(segments)
}

/// Blob store backed by a local directory
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, BlobError> {
        let segments = validate_blob_path(path)?;
        Ok(segments.iter().fold(self.root.clone(), |acc, s| acc.join(s)))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), BlobError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write then rename so readers never see a partial blob
        let mut temp = target.clone().into_os_string();
        temp.push(".partial");
        let temp = PathBuf::from(temp);
        fs::write(&temp, bytes).await?;
        fs::rename(&temp, &target).await?;

        debug!(path, bytes = bytes.len(), "Stored blob");
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, BlobError> {
        let target = self.resolve(path)?;
        match fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobError::NotFound(path.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<bool, BlobError> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => {
                debug!(path, "Deleted blob");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rejects_escaping_paths() {
        for path in ["", "/etc/passwd", "../secret", "a/../../b", "a//b", "a/./b", "a/", "c:\\x", "a\\b"] {
            assert!(
                matches!(validate_blob_path(path), Err(BlobError::InvalidPath(_))),
                "accepted {:?}",
                path
            );
        }
        assert_eq!(validate_blob_path("physics/week-1/notes.pdf").unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());

        store.put("physics/notes.pdf", b"%PDF-1.4").await.unwrap();
        assert_eq!(store.get("physics/notes.pdf").await.unwrap(), b"%PDF-1.4");
        assert!(dir.path().join("physics").join("notes.pdf").exists());

        store.put("physics/notes.pdf", b"replaced").await.unwrap();
        assert_eq!(store.get("physics/notes.pdf").await.unwrap(), b"replaced");

        assert!(store.delete("physics/notes.pdf").await.unwrap());
        assert!(!store.delete("physics/notes.pdf").await.unwrap());
        assert!(matches!(
            store.get("physics/notes.pdf").await,
            Err(BlobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_traversal_never_touches_disk() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path().join("blobs"));

        assert!(matches!(
            store.put("../outside.txt", b"x").await,
            Err(BlobError::InvalidPath(_))
        ));
        assert!(!dir.path().join("outside.txt").exists());
    }
}
