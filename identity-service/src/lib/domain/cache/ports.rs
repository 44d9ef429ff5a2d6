use std::time::Duration;

use async_trait::async_trait;

use crate::domain::cache::errors::KeyValueStoreError;

/// String key-value store with per-key expiration.
///
/// Backs both the session store and the read-through user cache. A single
/// `set` is atomic per key; nothing else is guaranteed across keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Store `value` under `key`, replacing any previous value, expiring after `ttl`.
    ///
    /// # Errors
    /// * `ConnectionFailed` - Store unreachable
    /// * `CommandFailed` - Store rejected the command
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KeyValueStoreError>;

    /// Read a value.
    ///
    /// # Returns
    /// `None` when the key is absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, KeyValueStoreError>;

    /// Remove a key. Absent keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), KeyValueStoreError>;

    /// Whether a live value exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, KeyValueStoreError>;

    /// Reset the expiration of an existing key.
    ///
    /// # Returns
    /// `false` when the key does not exist
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, KeyValueStoreError>;

    /// Round-trip to the store, used by health checks.
    async fn ping(&self) -> Result<(), KeyValueStoreError>;
}
