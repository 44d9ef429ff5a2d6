use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::cache::ports::KeyValueStore;
use crate::domain::health::errors::HealthError;
use crate::domain::health::models::ComponentHealth;
use crate::domain::health::models::HealthReport;
use crate::domain::health::ports::HealthIndicator;
use crate::domain::health::ports::HealthServicePort;

pub struct HealthService {
    database: Arc<dyn HealthIndicator>,
    cache: Arc<dyn HealthIndicator>,
    version: String,
}

impl HealthService {
    pub fn new(
        database: Arc<dyn HealthIndicator>,
        cache: Arc<dyn HealthIndicator>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            database,
            cache,
            version: version.into(),
        }
    }
}

fn component(result: Result<(), HealthError>, name: &str) -> ComponentHealth {
    match result {
        Ok(()) => ComponentHealth::ok(),
        Err(e) => {
            tracing::warn!(component = name, error = %e, "Health check failed");
            ComponentHealth::error(e.to_string())
        }
    }
}

#[async_trait]
impl HealthServicePort for HealthService {
    async fn check(&self) -> HealthReport {
        let (database, cache) = tokio::join!(self.database.check(), self.cache.check());

        HealthReport::new(
            self.version.clone(),
            component(database, "database"),
            component(cache, "cache"),
        )
    }
}

/// Health check backed by a key-value store PING.
pub struct KeyValueStoreHealth<KV>
where
    KV: KeyValueStore,
{
    store: Arc<KV>,
}

impl<KV> KeyValueStoreHealth<KV>
where
    KV: KeyValueStore,
{
    pub fn new(store: Arc<KV>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<KV> HealthIndicator for KeyValueStoreHealth<KV>
where
    KV: KeyValueStore,
{
    async fn check(&self) -> Result<(), HealthError> {
        self.store
            .ping()
            .await
            .map_err(|e| HealthError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use mockall::mock;

    use super::*;
    use crate::domain::health::models::Status;
    use crate::outbound::cache::InMemoryKeyValueStore;

    mock! {
        pub TestHealthIndicator {}

        #[async_trait]
        impl HealthIndicator for TestHealthIndicator {
            async fn check(&self) -> Result<(), HealthError>;
        }
    }

    fn healthy() -> Arc<dyn HealthIndicator> {
        let mut indicator = MockTestHealthIndicator::new();
        indicator.expect_check().returning(|| Ok(()));
        Arc::new(indicator)
    }

    #[tokio::test]
    async fn test_all_components_healthy() {
        let cache = Arc::new(KeyValueStoreHealth::new(Arc::new(InMemoryKeyValueStore::new())));
        let service = HealthService::new(healthy(), cache, "0.1.0");

        let report = service.check().await;
        assert!(report.is_healthy());
        assert_eq!(report.version, "0.1.0");
        assert_eq!(report.cache, ComponentHealth::ok());
    }

    #[tokio::test]
    async fn test_failed_dependency_degrades_report() {
        let mut database = MockTestHealthIndicator::new();
        database
            .expect_check()
            .times(1)
            .returning(|| Err(HealthError::Unavailable("connection refused".to_string())));

        let service = HealthService::new(Arc::new(database), healthy(), "0.1.0");

        let report = service.check().await;
        assert_eq!(report.status, Status::Error);
        assert_eq!(
            report.database,
            ComponentHealth::error("connection refused")
        );
        assert_eq!(report.cache.status, Status::Ok);
    }
}
