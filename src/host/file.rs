//! JSON-file backed key-value store.
//!
//! The whole map is rewritten on each `set`, which is fine for the handful
//! of capsules a single community produces. Writes run on the blocking
//! pool; the in-memory map only changes once the file is written.

use super::KeyValueStore;
use crate::error::{CapsuleError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default = "default_store_version")]
    version: u8,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

fn default_store_version() -> u8 {
    1
}

/// [`KeyValueStore`] persisted to a single JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = read_entries(&path)?;
        debug!("opened capsule store {} ({} entries)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(CapsuleError::Io(e)),
    };
    let file: StoreFile = serde_json::from_slice(&bytes)
        .map_err(|e| CapsuleError::Serialization(format!("cannot parse store file: {e}")))?;
    Ok(file.entries)
}

fn write_entries(path: &Path, entries: BTreeMap<String, String>) -> Result<BTreeMap<String, String>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CapsuleError::StoreWriteFailed(format!("cannot create store dir: {e}")))?;
    }
    let file = StoreFile {
        version: default_store_version(),
        entries,
    };
    let json = serde_json::to_string_pretty(&file)?;
    std::fs::write(path, json)
        .map_err(|e| CapsuleError::StoreWriteFailed(format!("cannot write store file: {e}")))?;
    Ok(file.entries)
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let mut updated = entries.clone();
        updated.insert(key.to_owned(), value);
        let path = self.path.clone();
        let written = tokio::task::spawn_blocking(move || write_entries(&path, updated))
            .await
            .map_err(|e| CapsuleError::StoreWriteFailed(format!("store writer task failed: {e}")))??;
        *entries = written;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("capsules.json");

        let store = FileStore::open(&path).unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        store.set("k", "{\"a\":1}".to_owned()).await.unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("k").await.unwrap().as_deref(), Some("{\"a\":1}"));
        assert_eq!(reopened.path(), path.as_path());
    }

    #[tokio::test]
    async fn failed_write_keeps_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capsules.json");
        let store = FileStore::open(&path).unwrap();
        store.set("k", "v1".to_owned()).await.unwrap();

        // A directory in place of the file makes the next write fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let err = store.set("k", "v2".to_owned()).await.unwrap_err();
        assert!(matches!(err, CapsuleError::StoreWriteFailed(_)));
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v1"));
    }

    #[test]
    fn corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capsules.json");
        std::fs::write(&path, "garbage").unwrap();
        assert!(matches!(
            FileStore::open(&path),
            Err(CapsuleError::Serialization(_))
        ));
    }
}
