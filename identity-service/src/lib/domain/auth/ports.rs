use async_trait::async_trait;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::LoginCommand;
use crate::domain::auth::models::LoginResult;
use crate::domain::auth::models::RegisterCommand;
use crate::domain::auth::models::TokenPair;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserResponse;

/// Port for the register/login/refresh/logout lifecycle.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Create a user account. No session is started.
    ///
    /// # Errors
    /// * `Conflict` - Email is already registered
    /// * `Internal` - Hashing or storage failed
    async fn register(&self, command: RegisterCommand) -> Result<UserResponse, AuthError>;

    /// Check credentials and start a session.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password, indistinguishably
    /// * `Internal` - Signing, entropy or storage failed
    async fn login(&self, command: LoginCommand) -> Result<LoginResult, AuthError>;

    /// Exchange the caller's current refresh token for a new pair,
    /// invalidating it.
    ///
    /// # Errors
    /// * `InvalidRefreshToken` - Token unknown, expired, already rotated or
    ///   owned by another user
    /// * `Internal` - Signing, entropy or storage failed
    async fn refresh(&self, user_id: &UserId, refresh_token: &str) -> Result<TokenPair, AuthError>;

    /// End the session of a user. Succeeds when there is none.
    ///
    /// # Errors
    /// * `Internal` - Storage failed
    async fn logout(&self, user_id: &UserId) -> Result<(), AuthError>;
}
