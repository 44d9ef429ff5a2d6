use thiserror::Error;

/// Error for key-value store operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyValueStoreError {
    #[error("Key-value store connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Key-value store command failed: {0}")]
    CommandFailed(String),
}
