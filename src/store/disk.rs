//! Disk-based storage backend.

use crate::error::{AppError, AppResult};
use crate::store::StorageBackend;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Disk storage backend
///
/// Persists each collection as `{base}/{collection}.json`. Writes go to a
/// sibling temp file first and are renamed over the target, so a crash
/// mid-write leaves the previous snapshot intact.
#[derive(Clone)]
pub struct DiskBackend {
    base_path: PathBuf,
}

impl DiskBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", collection))
    }
}

#[async_trait]
impl StorageBackend for DiskBackend {
    async fn load(&self, collection: &str) -> AppResult<Option<String>> {
        match fs::read_to_string(self.collection_path(collection)).await {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to read collection {}: {}",
                collection, e
            ))),
        }
    }

    async fn save(&self, collection: &str, payload: &str) -> AppResult<()> {
        let path = self.collection_path(collection);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Storage(format!("Failed to create data directory: {}", e))
            })?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, payload).await.map_err(|e| {
            AppError::Storage(format!("Failed to write collection {}: {}", collection, e))
        })?;
        fs::rename(&tmp, &path).await.map_err(|e| {
            AppError::Storage(format!(
                "Failed to commit collection {}: {}",
                collection, e
            ))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let backend = DiskBackend::new(dir.path().to_path_buf());

        backend.save("users", r#"{"a":1}"#).await.unwrap();
        let loaded = backend.load("users").await.unwrap();
        assert_eq!(loaded.as_deref(), Some(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_load_missing_collection() {
        let dir = tempdir().unwrap();
        let backend = DiskBackend::new(dir.path().to_path_buf());

        assert_eq!(backend.load("nothing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempdir().unwrap();
        let backend = DiskBackend::new(dir.path().to_path_buf());

        backend.save("users", "old").await.unwrap();
        backend.save("users", "new").await.unwrap();
        assert_eq!(backend.load("users").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = tempdir().unwrap();
        let backend = DiskBackend::new(dir.path().to_path_buf());

        backend.save("users", "payload").await.unwrap();
        assert!(!dir.path().join("users.json.tmp").exists());
        assert!(dir.path().join("users.json").exists());
    }
}
