//! Persistence of the local state document.
//!
//! The whole state lives in one JSON document (see
//! [`StateSnapshot`](quotesync_engine::StateSnapshot)); backends only move
//! strings around.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the state document is kept.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the document; `None` when nothing was saved yet.
    async fn load(&self) -> Result<Option<String>, StorageError>;

    /// Replace the document.
    async fn save(&self, document: &str) -> Result<(), StorageError>;

    /// Keep a document that could not be read somewhere it will not be
    /// overwritten by the next [`save`](Storage::save).
    async fn quarantine(&self, document: &str) -> Result<(), StorageError>;
}

/// State document in a file.
///
/// Saves go to a sibling temp file which is then renamed over the target, so
/// a crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling("tmp")
    }

    /// Where an unreadable document is moved before the state is reseeded.
    pub fn quarantine_path(&self) -> PathBuf {
        self.sibling("corrupt")
    }

    fn sibling(&self, extension: &str) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(extension);
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(document) => Ok(Some(document)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    async fn save(&self, document: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, document)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.io_error(e))
    }

    async fn quarantine(&self, document: &str) -> Result<(), StorageError> {
        let target = self.quarantine_path();
        tokio::fs::write(&target, document)
            .await
            .map_err(|source| StorageError::Io {
                path: target.clone(),
                source,
            })?;
        tracing::warn!(path = %target.display(), "unreadable state document set aside");
        Ok(())
    }
}

/// State document in memory, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    document: Mutex<Option<String>>,
    quarantined: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document.
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(document.into())),
            quarantined: Mutex::new(None),
        }
    }

    /// The last document set aside as unreadable.
    pub async fn quarantined(&self) -> Option<String> {
        self.quarantined.lock().await.clone()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.document.lock().await.clone())
    }

    async fn save(&self, document: &str) -> Result<(), StorageError> {
        *self.document.lock().await = Some(document.to_string());
        Ok(())
    }

    async fn quarantine(&self, document: &str) -> Result<(), StorageError> {
        *self.quarantined.lock().await = Some(document.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested").join("state.json"));

        assert_eq!(storage.load().await.unwrap(), None);

        storage.save("{\"quotes\":[]}").await.unwrap();
        storage.save("{\"quotes\":[1]}").await.unwrap();

        assert_eq!(storage.load().await.unwrap().as_deref(), Some("{\"quotes\":[1]}"));
        assert!(!storage.temp_path().exists());
    }

    #[tokio::test]
    async fn quarantine_keeps_a_sibling_copy() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("state.json"));
        storage.save("{ broken").await.unwrap();

        storage.quarantine("{ broken").await.unwrap();
        storage.save("{}").await.unwrap();

        assert_eq!(storage.quarantine_path(), dir.path().join("state.json.corrupt"));
        let kept = tokio::fs::read_to_string(storage.quarantine_path()).await.unwrap();
        assert_eq!(kept, "{ broken");
        assert_eq!(storage.load().await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn unreadable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be read as a file.
        let storage = FileStorage::new(dir.path());

        assert!(matches!(storage.load().await, Err(StorageError::Io { .. })));
    }

    #[tokio::test]
    async fn memory_storage_roundtrip() {
        let storage = MemoryStorage::with_document("old");
        assert_eq!(storage.load().await.unwrap().as_deref(), Some("old"));

        storage.save("new").await.unwrap();
        assert_eq!(storage.load().await.unwrap().as_deref(), Some("new"));
    }
}
