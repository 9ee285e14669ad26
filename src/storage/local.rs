//! Local filesystem state store.
//!
//! The snapshot is kept verbatim in one file. Writes go to a sibling
//! `.tmp` file first and are renamed into place, so a crash mid-write never
//! leaves a truncated snapshot behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Snapshot;
use crate::storage::StateStore;

/// File-backed single-slot store.
#[derive(Debug, Clone)]
pub struct LocalStateStore {
    path: PathBuf,
}

impl LocalStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn load(&self) -> Result<Option<Snapshot>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(blob) => Ok(Some(Snapshot::from_persisted(blob))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No state at {} yet", self.path.display());
                Ok(None)
            }
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        self.write_bytes(snapshot.as_str().as_bytes()).await?;
        log::debug!("Snapshot written to {}", self.path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AvailabilityRecord, SlotStatus};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStateStore::new(tmp.path().join("state.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStateStore::new(tmp.path().join("nested/dir/state.json"));
        let snapshot = Snapshot::encode(&[AvailabilityRecord::new("12 May", SlotStatus::Free)]);

        store.save(&snapshot).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(snapshot));
        assert!(!tmp.path().join("nested/dir/state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStateStore::new(tmp.path().join("state.json"));

        store.save(&Snapshot::encode(&[])).await.unwrap();
        let second = Snapshot::encode(&[AvailabilityRecord::new("", SlotStatus::Unavailable)]);
        store.save(&second).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_blob_is_stored_verbatim() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, "legacy blob").unwrap();

        let store = LocalStateStore::new(&path);
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.as_str(), "legacy blob");
    }

    #[tokio::test]
    async fn test_save_into_unwritable_location_fails() {
        let tmp = TempDir::new().unwrap();
        // A regular file cannot act as a parent directory.
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = LocalStateStore::new(blocker.join("state.json"));

        assert!(store.save(&Snapshot::encode(&[])).await.is_err());
    }
}
