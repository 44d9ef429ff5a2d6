use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::health::errors::HealthError;
use crate::domain::health::ports::HealthIndicator;

/// Database health check running `SELECT 1` on the pool.
pub struct PostgresHealthIndicator {
    pool: PgPool,
}

impl PostgresHealthIndicator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthIndicator for PostgresHealthIndicator {
    async fn check(&self) -> Result<(), HealthError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| HealthError::Unavailable(e.to_string()))
    }
}
