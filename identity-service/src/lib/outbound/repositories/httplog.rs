use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::httplog::errors::HttpLogError;
use crate::domain::httplog::models::ErrorLog;
use crate::domain::httplog::models::IncomingRequestLog;
use crate::domain::httplog::models::OutgoingResponseLog;
use crate::domain::httplog::models::RequestLogs;
use crate::domain::httplog::models::RequestSnapshot;
use crate::domain::httplog::models::ResponseSnapshot;
use crate::domain::httplog::ports::HttpLogRepository;

/// Request/response log tables with JSONB payloads.
pub struct PostgresHttpLogRepository {
    pool: PgPool,
}

impl PostgresHttpLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct IncomingRow {
    id: Uuid,
    trace_id: String,
    event_name: String,
    endpoint: String,
    method: String,
    request: Json<RequestSnapshot>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<IncomingRow> for IncomingRequestLog {
    fn from(row: IncomingRow) -> Self {
        Self {
            id: row.id,
            trace_id: row.trace_id,
            event_name: row.event_name,
            endpoint: row.endpoint,
            method: row.method,
            request: row.request.0,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OutgoingRow {
    id: Uuid,
    trace_id: String,
    request_id: Uuid,
    event_name: String,
    endpoint: String,
    method: String,
    status_code: i32,
    response: Json<ResponseSnapshot>,
    user_id: Option<String>,
    latency_ms: i64,
    created_at: DateTime<Utc>,
}

impl From<OutgoingRow> for OutgoingResponseLog {
    fn from(row: OutgoingRow) -> Self {
        Self {
            id: row.id,
            trace_id: row.trace_id,
            request_id: row.request_id,
            event_name: row.event_name,
            endpoint: row.endpoint,
            method: row.method,
            status_code: u16::try_from(row.status_code).unwrap_or_default(),
            response: row.response.0,
            user_id: row.user_id,
            latency_ms: row.latency_ms,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ErrorRow {
    id: Uuid,
    trace_id: String,
    request_id: Option<Uuid>,
    status_code: i32,
    error: String,
    created_at: DateTime<Utc>,
}

impl From<ErrorRow> for ErrorLog {
    fn from(row: ErrorRow) -> Self {
        Self {
            id: row.id,
            trace_id: row.trace_id,
            request_id: row.request_id,
            status_code: u16::try_from(row.status_code).unwrap_or_default(),
            error: row.error,
            created_at: row.created_at,
        }
    }
}

fn database_error(e: sqlx::Error) -> HttpLogError {
    HttpLogError::DatabaseError(e.to_string())
}

#[async_trait]
impl HttpLogRepository for PostgresHttpLogRepository {
    async fn save_incoming(&self, log: &IncomingRequestLog) -> Result<(), HttpLogError> {
        sqlx::query(
            r#"
            INSERT INTO log_incoming_requests
                (id, trace_id, event_name, endpoint, method, request, ip_address, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(log.id)
        .bind(&log.trace_id)
        .bind(&log.event_name)
        .bind(&log.endpoint)
        .bind(&log.method)
        .bind(Json(&log.request))
        .bind(&log.ip_address)
        .bind(&log.user_agent)
        .bind(log.created_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(())
    }

    async fn save_outgoing(&self, log: &OutgoingResponseLog) -> Result<(), HttpLogError> {
        sqlx::query(
            r#"
            INSERT INTO log_outgoing_responses
                (id, trace_id, request_id, event_name, endpoint, method, status_code,
                 response, user_id, latency_ms, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(log.id)
        .bind(&log.trace_id)
        .bind(log.request_id)
        .bind(&log.event_name)
        .bind(&log.endpoint)
        .bind(&log.method)
        .bind(i32::from(log.status_code))
        .bind(Json(&log.response))
        .bind(&log.user_id)
        .bind(log.latency_ms)
        .bind(log.created_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(())
    }

    async fn save_error(&self, log: &ErrorLog) -> Result<(), HttpLogError> {
        sqlx::query(
            r#"
            INSERT INTO log_errors (id, trace_id, request_id, status_code, error, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(log.id)
        .bind(&log.trace_id)
        .bind(log.request_id)
        .bind(i32::from(log.status_code))
        .bind(&log.error)
        .bind(log.created_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(())
    }

    async fn find_by_trace_id(&self, trace_id: &str) -> Result<RequestLogs, HttpLogError> {
        let incoming_requests = sqlx::query_as::<_, IncomingRow>(
            r#"
            SELECT id, trace_id, event_name, endpoint, method, request, ip_address, user_agent, created_at
            FROM log_incoming_requests
            WHERE trace_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(trace_id)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        let outgoing_responses = sqlx::query_as::<_, OutgoingRow>(
            r#"
            SELECT id, trace_id, request_id, event_name, endpoint, method, status_code,
                   response, user_id, latency_ms, created_at
            FROM log_outgoing_responses
            WHERE trace_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(trace_id)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        let errors = sqlx::query_as::<_, ErrorRow>(
            r#"
            SELECT id, trace_id, request_id, status_code, error, created_at
            FROM log_errors
            WHERE trace_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(trace_id)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(RequestLogs {
            incoming_requests: incoming_requests.into_iter().map(Into::into).collect(),
            outgoing_responses: outgoing_responses.into_iter().map(Into::into).collect(),
            errors: errors.into_iter().map(Into::into).collect(),
        })
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, HttpLogError> {
        let mut transaction = self.pool.begin().await.map_err(database_error)?;
        let mut removed = 0;

        // Children first: errors and responses reference requests.
        for statement in [
            "DELETE FROM log_errors WHERE created_at < $1",
            "DELETE FROM log_outgoing_responses WHERE created_at < $1",
            "DELETE FROM log_incoming_requests WHERE created_at < $1",
        ] {
            removed += sqlx::query(statement)
                .bind(cutoff)
                .execute(&mut *transaction)
                .await
                .map_err(database_error)?
                .rows_affected();
        }

        transaction.commit().await.map_err(database_error)?;
        Ok(removed)
    }
}
