//! Key-value storage trait definitions.

use async_trait::async_trait;

use seedkeeper_common::Result;

/// Durable per-origin key-value storage.
///
/// Values written here survive restarts of the hosting environment. In a
/// browser this is backed by origin-local storage; natively by a file.
#[async_trait]
pub trait DurableKv: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the value stored under `key`. Removing a missing key is not
    /// an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile tab-scoped key-value storage.
///
/// Values written here survive page reloads within one tab but not tab
/// closure or restarts. Holds at most the session auto-passphrase.
#[async_trait]
pub trait VolatileKv: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the value stored under `key`. Removing a missing key is not
    /// an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
