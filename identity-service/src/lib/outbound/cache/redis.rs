use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;

use crate::domain::cache::errors::KeyValueStoreError;
use crate::domain::cache::ports::KeyValueStore;

/// Redis-backed key-value store.
///
/// Holds a `ConnectionManager`, a multiplexed connection that reconnects on
/// failure. Cloning it is cheap and shares the underlying connection.
#[derive(Clone)]
pub struct RedisKeyValueStore {
    connection: ConnectionManager,
}

impl RedisKeyValueStore {
    /// Connect and verify the server answers PING.
    ///
    /// # Errors
    /// * `ConnectionFailed` - Bad URL, unreachable server or failed PING
    pub async fn connect(url: &str) -> Result<Self, KeyValueStoreError> {
        let client = Client::open(url).map_err(connection_failed)?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(connection_failed)?;

        let store = Self { connection };
        store.ping().await?;

        Ok(store)
    }
}

fn connection_failed(err: redis::RedisError) -> KeyValueStoreError {
    KeyValueStoreError::ConnectionFailed(err.to_string())
}

fn command_failed(err: redis::RedisError) -> KeyValueStoreError {
    if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
        KeyValueStoreError::ConnectionFailed(err.to_string())
    } else {
        KeyValueStoreError::CommandFailed(err.to_string())
    }
}

/// Redis expirations are whole seconds; never round a live TTL down to zero.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KeyValueStoreError> {
        let mut connection = self.connection.clone();
        connection
            .set_ex::<_, _, ()>(key, value, ttl_seconds(ttl))
            .await
            .map_err(command_failed)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KeyValueStoreError> {
        let mut connection = self.connection.clone();
        connection
            .get::<_, Option<String>>(key)
            .await
            .map_err(command_failed)
    }

    async fn delete(&self, key: &str) -> Result<(), KeyValueStoreError> {
        let mut connection = self.connection.clone();
        connection
            .del::<_, ()>(key)
            .await
            .map_err(command_failed)
    }

    async fn exists(&self, key: &str) -> Result<bool, KeyValueStoreError> {
        let mut connection = self.connection.clone();
        connection
            .exists::<_, bool>(key)
            .await
            .map_err(command_failed)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, KeyValueStoreError> {
        let mut connection = self.connection.clone();
        connection
            .expire::<_, bool>(key, ttl_seconds(ttl) as i64)
            .await
            .map_err(command_failed)
    }

    async fn ping(&self) -> Result<(), KeyValueStoreError> {
        let mut connection = self.connection.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut connection)
            .await
            .map(|_| ())
            .map_err(connection_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_seconds_never_zero() {
        assert_eq!(ttl_seconds(Duration::from_millis(200)), 1);
        assert_eq!(ttl_seconds(Duration::from_secs(300)), 300);
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let result = RedisKeyValueStore::connect("not a redis url").await;
        assert!(matches!(
            result,
            Err(KeyValueStoreError::ConnectionFailed(_))
        ));
    }
}
