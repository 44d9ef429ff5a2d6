use thiserror::Error;

/// Error for request/response log persistence and queries
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpLogError {
    #[error("Retention must be between 1 and 36500 days, got {0}")]
    InvalidRetention(i64),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
