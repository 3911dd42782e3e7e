//! File-based key-value storage
//!
//! Each key is stored as `<dir>/<key>.json`.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::backend::KeyValueStorage;
use crate::{Error, Result};

/// Key-value storage backed by one file per key
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage rooted at `dir`
    ///
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(Error::Config(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;

        // Ensure parent directory exists
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write a sibling first so a crash mid-write leaves the old value intact
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &value).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (FileStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("data"));
        (storage, temp_dir)
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let (storage, _temp) = create_test_storage();
        assert!(storage.get("tasks").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (storage, _temp) = create_test_storage();

        storage.set("tasks", b"[]".to_vec()).await.unwrap();
        assert_eq!(storage.get("tasks").await.unwrap(), Some(b"[]".to_vec()));
        assert!(storage.dir().join("tasks.json").exists());
        assert!(!storage.dir().join("tasks.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let (storage, _temp) = create_test_storage();

        storage.set("tasks", b"first".to_vec()).await.unwrap();
        storage.set("tasks", b"second".to_vec()).await.unwrap();
        assert_eq!(storage.get("tasks").await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_remove() {
        let (storage, _temp) = create_test_storage();

        storage.set("tasks", b"[]".to_vec()).await.unwrap();
        assert!(storage.remove("tasks").await.unwrap());
        assert!(!storage.remove("tasks").await.unwrap());
        assert!(storage.get("tasks").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let (storage, _temp) = create_test_storage();

        for key in ["", "../escape", "a/b", ".hidden"] {
            match storage.get(key).await {
                Err(Error::Config(_)) => {}
                other => panic!("Expected Config error for {:?}, got: {:?}", key, other),
            }
        }
    }

    #[tokio::test]
    async fn test_persistence_across_instances() {
        let temp_dir = TempDir::new().unwrap();

        FileStorage::new(temp_dir.path())
            .set("tasks", b"kept".to_vec())
            .await
            .unwrap();

        let reopened = FileStorage::new(temp_dir.path());
        assert_eq!(reopened.get("tasks").await.unwrap(), Some(b"kept".to_vec()));
    }
}
