//! File-backed durable key-value storage.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

use crate::kv::DurableKv;
use seedkeeper_common::{Error, Result};

/// Durable key-value store persisted as a single JSON object in a file.
///
/// Serves native and development hosts where no browser origin storage
/// exists. Every write rewrites the whole file, which is adequate for the
/// handful of small values the custody engine persists.
pub struct FileKv {
    path: PathBuf,
}

impl FileKv {
    /// Create a store backed by the given file.
    ///
    /// # Postconditions
    /// - The parent directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Permission denied creating the parent directory
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Ok(Self { path })
    }

    async fn load(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let raw = fs::read_to_string(&self.path).await?;
        match serde_json::from_str(&raw) {
            Ok(map) => Ok(map),
            Err(err) => {
                // An unparsable file is treated as empty rather than fatal,
                // matching how the registry treats a corrupt snapshot.
                warn!(path = %self.path.display(), %err, "discarding unparsable key-value file");
                Ok(HashMap::new())
            }
        }
    }

    async fn save(&self, map: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string(map)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[async_trait]
impl DurableKv for FileKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.load().await?;
        map.insert(key.to_string(), value.to_string());
        self.save(&map).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.load().await?;
        if map.remove(key).is_some() {
            self.save(&map).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_set_get_remove() {
        let dir = tempdir().unwrap();
        let kv = FileKv::new(dir.path().join("store.json")).unwrap();

        assert_eq!(kv.get("k").await.unwrap(), None);

        kv.set("k", "v").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), Some("v".to_string()));

        kv.remove("k").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let kv = FileKv::new(&path).unwrap();
            kv.set("k", "v").await.unwrap();
        }

        let reopened = FileKv::new(&path).unwrap();
        assert_eq!(reopened.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_unparsable_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json at all").unwrap();

        let kv = FileKv::new(&path).unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);

        // Writes recover the file
        kv.set("k", "v").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), Some("v".to_string()));
    }
}
