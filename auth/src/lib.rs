//! Authentication utilities library
//!
//! Credential primitives for the identity service:
//! - Password hashing (Argon2id)
//! - JWT encoding and validation pinned to HS256
//! - Token issuing: signed access tokens and opaque refresh tokens
//!
//! Nothing here performs I/O. Session persistence and user lookup live in
//! the service that consumes this crate.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Access and refresh tokens
//! ```
//! use auth::TokenIssuer;
//! use chrono::Duration;
//!
//! let issuer = TokenIssuer::new(
//!     b"secret_key_at_least_32_bytes_long!",
//!     "identity-service",
//!     Duration::minutes(15),
//! );
//!
//! let access = issuer.issue_access_token("user123").unwrap();
//! let user_id = issuer.validate_access_token(&access.token).unwrap();
//! assert_eq!(user_id, "user123");
//!
//! let refresh = issuer.issue_refresh_token().unwrap();
//! assert_eq!(refresh.len(), 44);
//! ```

pub mod issuer;
pub mod jwt;
pub mod password;
pub mod refresh;

// Re-export commonly used items
pub use issuer::IssuedAccessToken;
pub use issuer::TokenError;
pub use issuer::TokenIssuer;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use refresh::generate_refresh_token;
pub use refresh::EntropyError;
