use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::httplog::errors::HttpLogError;
use crate::domain::httplog::models::ErrorLog;
use crate::domain::httplog::models::IncomingRequestLog;
use crate::domain::httplog::models::OutgoingResponseLog;
use crate::domain::httplog::models::RequestLogs;

/// Port for request/response logging used by the HTTP middleware and jobs.
///
/// Recording never fails the caller; persistence errors are logged.
#[async_trait]
pub trait HttpLogServicePort: Send + Sync + 'static {
    async fn log_incoming(&self, log: IncomingRequestLog);

    async fn log_outgoing(&self, log: OutgoingResponseLog);

    async fn log_error(&self, log: ErrorLog);

    /// Everything recorded under `trace_id`.
    ///
    /// # Errors
    /// * `DatabaseError` - Query failed
    async fn request_logs(&self, trace_id: &str) -> Result<RequestLogs, HttpLogError>;

    /// Delete rows older than `days` days.
    ///
    /// # Returns
    /// Number of rows removed across all log tables
    ///
    /// # Errors
    /// * `InvalidRetention` - `days` is zero or negative
    /// * `DatabaseError` - Delete failed
    async fn cleanup_older_than(&self, days: i64) -> Result<u64, HttpLogError>;
}

/// Persistence operations for request/response logs.
#[async_trait]
pub trait HttpLogRepository: Send + Sync + 'static {
    async fn save_incoming(&self, log: &IncomingRequestLog) -> Result<(), HttpLogError>;

    async fn save_outgoing(&self, log: &OutgoingResponseLog) -> Result<(), HttpLogError>;

    async fn save_error(&self, log: &ErrorLog) -> Result<(), HttpLogError>;

    async fn find_by_trace_id(&self, trace_id: &str) -> Result<RequestLogs, HttpLogError>;

    /// # Returns
    /// Number of rows removed
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, HttpLogError>;
}
