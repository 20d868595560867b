//! In-memory key-value storage for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::kv::{DurableKv, VolatileKv};
use seedkeeper_common::Result;

/// In-memory key-value store.
///
/// Implements both [`DurableKv`] and [`VolatileKv`]. Useful for testing and
/// development; all data is lost on drop. Clones share the same map, which
/// lets a test hold onto "storage" across registry instances to simulate a
/// page reload.
#[derive(Clone)]
pub struct MemoryKv {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryKv {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Check if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DurableKv for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().unwrap().remove(key);
        Ok(())
    }
}

#[async_trait]
impl VolatileKv for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        DurableKv::get(self, key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        DurableKv::set(self, key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        DurableKv::remove(self, key).await
    }
}
