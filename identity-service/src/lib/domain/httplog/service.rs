use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use chrono::Utc;

use crate::domain::httplog::errors::HttpLogError;
use crate::domain::httplog::models::ErrorLog;
use crate::domain::httplog::models::IncomingRequestLog;
use crate::domain::httplog::models::OutgoingResponseLog;
use crate::domain::httplog::models::RequestLogs;
use crate::domain::httplog::ports::HttpLogRepository;
use crate::domain::httplog::ports::HttpLogServicePort;

/// Longest retention accepted by cleanup, roughly a century.
pub const MAX_RETENTION_DAYS: i64 = 36_500;

pub struct HttpLogService<R>
where
    R: HttpLogRepository,
{
    repository: Arc<R>,
}

impl<R> HttpLogService<R>
where
    R: HttpLogRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R> HttpLogServicePort for HttpLogService<R>
where
    R: HttpLogRepository,
{
    async fn log_incoming(&self, log: IncomingRequestLog) {
        if let Err(e) = self.repository.save_incoming(&log).await {
            tracing::error!(
                trace_id = %log.trace_id,
                error = %e,
                "Failed to persist incoming request log"
            );
        }
    }

    async fn log_outgoing(&self, log: OutgoingResponseLog) {
        if let Err(e) = self.repository.save_outgoing(&log).await {
            tracing::error!(
                trace_id = %log.trace_id,
                error = %e,
                "Failed to persist outgoing response log"
            );
        }
    }

    async fn log_error(&self, log: ErrorLog) {
        if let Err(e) = self.repository.save_error(&log).await {
            tracing::error!(trace_id = %log.trace_id, error = %e, "Failed to persist error log");
        }
    }

    async fn request_logs(&self, trace_id: &str) -> Result<RequestLogs, HttpLogError> {
        self.repository.find_by_trace_id(trace_id).await
    }

    async fn cleanup_older_than(&self, days: i64) -> Result<u64, HttpLogError> {
        if !(1..=MAX_RETENTION_DAYS).contains(&days) {
            return Err(HttpLogError::InvalidRetention(days));
        }

        let cutoff = Utc::now() - Duration::days(days);
        let removed = self.repository.delete_older_than(cutoff).await?;
        tracing::info!(days, removed, "Old HTTP logs removed");

        Ok(removed)
    }
}
