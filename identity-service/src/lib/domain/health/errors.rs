use thiserror::Error;

/// Error reported by a dependency health check
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HealthError {
    #[error("{0}")]
    Unavailable(String),
}
