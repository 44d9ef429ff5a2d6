use async_trait::async_trait;

use crate::domain::health::errors::HealthError;
use crate::domain::health::models::HealthReport;

/// Liveness check for a single dependency.
#[async_trait]
pub trait HealthIndicator: Send + Sync + 'static {
    async fn check(&self) -> Result<(), HealthError>;
}

#[async_trait]
pub trait HealthServicePort: Send + Sync + 'static {
    async fn check(&self) -> HealthReport;
}
