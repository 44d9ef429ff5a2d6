use thiserror::Error;

use crate::domain::cache::errors::KeyValueStoreError;
use crate::domain::user::errors::UserError;

/// Error for password policy violations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password too short: minimum {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },
}

/// Error surfaced by the auth orchestrator
///
/// Credential failures share one message so callers cannot tell an unknown
/// email from a wrong password.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Email already exists: {0}")]
    Conflict(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid or expired refresh token")]
    InvalidRefreshToken,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<UserError> for AuthError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::EmailAlreadyExists(email) => AuthError::Conflict(email),
            UserError::InvalidUserId(_)
            | UserError::InvalidName(_)
            | UserError::InvalidEmail(_) => AuthError::Validation(err.to_string()),
            UserError::NotFound(_) | UserError::DatabaseError(_) => {
                AuthError::Internal(err.to_string())
            }
        }
    }
}

impl From<KeyValueStoreError> for AuthError {
    fn from(err: KeyValueStoreError) -> Self {
        AuthError::Internal(format!("Session store failed: {}", err))
    }
}

impl From<auth::TokenError> for AuthError {
    fn from(err: auth::TokenError) -> Self {
        AuthError::Internal(format!("Token issuing failed: {}", err))
    }
}

impl From<auth::PasswordError> for AuthError {
    fn from(err: auth::PasswordError) -> Self {
        AuthError::Internal(format!("Password hashing failed: {}", err))
    }
}
