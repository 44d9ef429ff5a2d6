use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::cache::ports::KeyValueStore;
use crate::domain::cache::user_cache_key;
use crate::domain::user::errors::UserError;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserResponse;
use crate::domain::user::ports::UserRepository;
use crate::domain::user::ports::UserServicePort;

/// Cache-aside user lookup.
///
/// The directory is the source of truth. Cache failures are logged and
/// degrade to a directory read; they never fail a lookup.
pub struct UserService<UR, KV>
where
    UR: UserRepository,
    KV: KeyValueStore,
{
    repository: Arc<UR>,
    cache: Arc<KV>,
    cache_ttl: Duration,
}

impl<UR, KV> UserService<UR, KV>
where
    UR: UserRepository,
    KV: KeyValueStore,
{
    /// Create a new user service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User directory
    /// * `cache` - Key-value store holding serialized projections
    /// * `cache_ttl` - Lifetime of a cached projection
    pub fn new(repository: Arc<UR>, cache: Arc<KV>, cache_ttl: Duration) -> Self {
        Self {
            repository,
            cache,
            cache_ttl,
        }
    }

    async fn read_cache(&self, key: &str) -> Option<UserResponse> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(user) => {
                    tracing::debug!(cache_key = %key, "User cache hit");
                    Some(user)
                }
                Err(e) => {
                    tracing::warn!(
                        cache_key = %key,
                        error = %e,
                        "Discarding undecodable cache entry"
                    );
                    None
                }
            },
            Ok(None) => {
                tracing::debug!(cache_key = %key, "User cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "User cache read failed");
                None
            }
        }
    }

    async fn write_cache(&self, key: &str, user: &UserResponse) {
        let raw = match serde_json::to_string(user) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Failed to serialize user for cache");
                return;
            }
        };

        if let Err(e) = self.cache.set(key, &raw, self.cache_ttl).await {
            tracing::warn!(cache_key = %key, error = %e, "User cache write failed");
        }
    }
}

#[async_trait]
impl<UR, KV> UserServicePort for UserService<UR, KV>
where
    UR: UserRepository,
    KV: KeyValueStore,
{
    async fn get_user(&self, id: &str) -> Result<UserResponse, UserError> {
        let user_id = UserId::from_string(id)?;
        let key = user_cache_key(&user_id.to_string());

        if let Some(cached) = self.read_cache(&key).await {
            return Ok(cached);
        }

        let user = self
            .repository
            .find_by_id(&user_id)
            .await?
            .ok_or(UserError::NotFound(user_id.to_string()))?;

        let response = UserResponse::from(&user);
        self.write_cache(&key, &response).await;

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use chrono::Utc;
    use mockall::mock;

    use super::*;
    use crate::domain::cache::errors::KeyValueStoreError;
    use crate::domain::user::models::DisplayName;
    use crate::domain::user::models::EmailAddress;
    use crate::domain::user::models::User;
    use crate::outbound::cache::InMemoryKeyValueStore;

    mock! {
        pub TestUserRepository {}

        #[async_trait]
        impl UserRepository for TestUserRepository {
            async fn create(&self, user: User) -> Result<User, UserError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;
            async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError>;
            async fn count_active(&self) -> Result<i64, UserError>;
            async fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64, UserError>;
        }
    }

    mock! {
        pub TestKeyValueStore {}

        #[async_trait]
        impl KeyValueStore for TestKeyValueStore {
            async fn set(
                &self,
                key: &str,
                value: &str,
                ttl: Duration,
            ) -> Result<(), KeyValueStoreError>;
            async fn get(&self, key: &str) -> Result<Option<String>, KeyValueStoreError>;
            async fn delete(&self, key: &str) -> Result<(), KeyValueStoreError>;
            async fn exists(&self, key: &str) -> Result<bool, KeyValueStoreError>;
            async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, KeyValueStoreError>;
            async fn ping(&self) -> Result<(), KeyValueStoreError>;
        }
    }

    const TTL: Duration = Duration::from_secs(300);

    fn test_user() -> User {
        User::new(
            DisplayName::new("Ada".to_string()).unwrap(),
            EmailAddress::new("ada@example.com".to_string()).unwrap(),
            "$argon2id$test_hash".to_string(),
        )
    }

    #[tokio::test]
    async fn test_get_user_populates_cache_then_skips_directory() {
        let mut repository = MockTestUserRepository::new();
        let user = test_user();
        let user_id = user.id;

        let returned_user = user.clone();
        repository
            .expect_find_by_id()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(move |_| Ok(Some(returned_user.clone())));

        let cache = Arc::new(InMemoryKeyValueStore::new());
        let service = UserService::new(Arc::new(repository), Arc::clone(&cache), TTL);

        let first = service.get_user(&user_id.to_string()).await.unwrap();
        assert!(cache
            .exists(&user_cache_key(&user_id.to_string()))
            .await
            .unwrap());

        let second = service.get_user(&user_id.to_string()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_get_user_malformed_id_touches_nothing() {
        let mut repository = MockTestUserRepository::new();
        let mut cache = MockTestKeyValueStore::new();

        repository.expect_find_by_id().times(0);
        cache.expect_get().times(0);
        cache.expect_set().times(0);

        let service = UserService::new(Arc::new(repository), Arc::new(cache), TTL);

        let result = service.get_user("not-a-uuid").await;
        assert!(matches!(result, Err(UserError::InvalidUserId(_))));
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(None));

        let cache = Arc::new(InMemoryKeyValueStore::new());
        let service = UserService::new(Arc::new(repository), cache, TTL);

        let result = service.get_user(&UserId::new().to_string()).await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cache_failures_do_not_fail_lookup() {
        let mut repository = MockTestUserRepository::new();
        let mut cache = MockTestKeyValueStore::new();
        let user = test_user();
        let user_id = user.id;

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        cache
            .expect_get()
            .times(1)
            .returning(|_| Err(KeyValueStoreError::ConnectionFailed("down".to_string())));
        cache
            .expect_set()
            .times(1)
            .returning(|_, _, _| Err(KeyValueStoreError::ConnectionFailed("down".to_string())));

        let service = UserService::new(Arc::new(repository), Arc::new(cache), TTL);

        let result = service.get_user(&user_id.to_string()).await;
        assert_eq!(result.unwrap().id, user_id.to_string());
    }

    #[tokio::test]
    async fn test_undecodable_cache_entry_falls_back_to_directory() {
        let mut repository = MockTestUserRepository::new();
        let user = test_user();
        let user_id = user.id;

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let cache = Arc::new(InMemoryKeyValueStore::new());
        cache
            .set(&user_cache_key(&user_id.to_string()), "{not json", TTL)
            .await
            .unwrap();

        let service = UserService::new(Arc::new(repository), Arc::clone(&cache), TTL);

        let result = service.get_user(&user_id.to_string()).await.unwrap();
        assert_eq!(result.name, "Ada");

        let repaired = cache
            .get(&user_cache_key(&user_id.to_string()))
            .await
            .unwrap()
            .unwrap();
        assert!(repaired.contains("ada@example.com"));
    }

    #[tokio::test]
    async fn test_directory_error_propagates() {
        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Err(UserError::DatabaseError("connection reset".to_string())));

        let cache = Arc::new(InMemoryKeyValueStore::new());
        let service = UserService::new(Arc::new(repository), cache, TTL);

        let result = service.get_user(&UserId::new().to_string()).await;
        assert!(matches!(result, Err(UserError::DatabaseError(_))));
    }
}
