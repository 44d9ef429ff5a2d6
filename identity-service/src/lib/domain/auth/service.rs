use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth::PasswordHasher;
use auth::TokenIssuer;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::LoginCommand;
use crate::domain::auth::models::LoginResult;
use crate::domain::auth::models::RegisterCommand;
use crate::domain::auth::models::TokenPair;
use crate::domain::auth::ports::AuthServicePort;
use crate::domain::cache::ports::KeyValueStore;
use crate::domain::cache::refresh_session_key;
use crate::domain::cache::refresh_token_key;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserResponse;
use crate::domain::user::ports::UserRepository;

/// Auth orchestrator.
///
/// A live session is two store entries sharing the refresh TTL:
/// `refresh_token:{user}` holds the current token and
/// `refresh_session:{token}` points back to the user. A token is accepted
/// only while both agree, so each user has at most one usable refresh token.
pub struct AuthService<UR, KV>
where
    UR: UserRepository,
    KV: KeyValueStore,
{
    repository: Arc<UR>,
    sessions: Arc<KV>,
    token_issuer: Arc<TokenIssuer>,
    password_hasher: PasswordHasher,
    refresh_ttl: Duration,
}

impl<UR, KV> AuthService<UR, KV>
where
    UR: UserRepository,
    KV: KeyValueStore,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User directory
    /// * `sessions` - Session store
    /// * `token_issuer` - Access and refresh token issuer
    /// * `refresh_ttl` - Session lifetime, applied on login and on every refresh
    pub fn new(
        repository: Arc<UR>,
        sessions: Arc<KV>,
        token_issuer: Arc<TokenIssuer>,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            repository,
            sessions,
            token_issuer,
            password_hasher: PasswordHasher::new(),
            refresh_ttl,
        }
    }

    /// Replace the default Argon2 cost.
    pub fn with_password_hasher(mut self, password_hasher: PasswordHasher) -> Self {
        self.password_hasher = password_hasher;
        self
    }

    fn issue_pair(&self, user_id: &UserId) -> Result<TokenPair, AuthError> {
        let access = self.token_issuer.issue_access_token(&user_id.to_string())?;
        let refresh_token = self.token_issuer.issue_refresh_token()?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token,
            access_expires_in: self.token_issuer.access_expires_in(),
            refresh_expires_in: self.refresh_ttl.as_secs() as i64,
        })
    }

    /// Point the user's slot at `refresh_token` and index it.
    async fn store_session(&self, user_id: &UserId, refresh_token: &str) -> Result<(), AuthError> {
        let user_id = user_id.to_string();

        self.sessions
            .set(&refresh_token_key(&user_id), refresh_token, self.refresh_ttl)
            .await?;
        self.sessions
            .set(&refresh_session_key(refresh_token), &user_id, self.refresh_ttl)
            .await?;

        Ok(())
    }

    /// Drop the index entry of whatever token currently occupies the slot.
    async fn revoke_current(&self, user_id: &UserId) -> Result<Option<String>, AuthError> {
        let current = self
            .sessions
            .get(&refresh_token_key(&user_id.to_string()))
            .await?;

        if let Some(token) = &current {
            self.sessions.delete(&refresh_session_key(token)).await?;
        }

        Ok(current)
    }

    async fn start_session(&self, user_id: &UserId) -> Result<TokenPair, AuthError> {
        let tokens = self.issue_pair(user_id)?;

        self.revoke_current(user_id).await?;
        self.store_session(user_id, &tokens.refresh_token).await?;

        Ok(tokens)
    }
}

#[async_trait]
impl<UR, KV> AuthServicePort for AuthService<UR, KV>
where
    UR: UserRepository,
    KV: KeyValueStore,
{
    async fn register(&self, command: RegisterCommand) -> Result<UserResponse, AuthError> {
        if self.repository.find_by_email(&command.email).await?.is_some() {
            return Err(AuthError::Conflict(command.email.to_string()));
        }

        let password_hash = self.password_hasher.hash(command.password.as_str())?;
        let user = User::new(command.name, command.email, password_hash);

        let created = self.repository.create(user).await?;
        tracing::info!(user_id = %created.id, "User registered");

        Ok(UserResponse::from(&created))
    }

    async fn login(&self, command: LoginCommand) -> Result<LoginResult, AuthError> {
        let email =
            EmailAddress::new(command.email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .repository
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self
            .password_hasher
            .verify(&command.password, &user.password_hash)?
        {
            tracing::info!(user_id = %user.id, "Login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.start_session(&user.id).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginResult {
            user: UserResponse::from(&user),
            tokens,
        })
    }

    async fn refresh(
        &self,
        caller: &UserId,
        refresh_token: &str,
    ) -> Result<TokenPair, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidRefreshToken);
        }

        let index_key = refresh_session_key(refresh_token);
        let owner = self
            .sessions
            .get(&index_key)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;
        let user_id = UserId::from_string(&owner).map_err(|_| AuthError::InvalidRefreshToken)?;

        // The owner's session is left intact.
        if user_id != *caller {
            tracing::warn!(
                user_id = %caller,
                owner = %user_id,
                "Rejected refresh token owned by another user"
            );
            return Err(AuthError::InvalidRefreshToken);
        }

        let current = self
            .sessions
            .get(&refresh_token_key(&user_id.to_string()))
            .await?;
        if current.as_deref() != Some(refresh_token) {
            tracing::warn!(user_id = %user_id, "Rejected superseded refresh token");
            self.sessions.delete(&index_key).await?;
            return Err(AuthError::InvalidRefreshToken);
        }

        let tokens = self.issue_pair(&user_id)?;
        self.sessions.delete(&index_key).await?;
        self.store_session(&user_id, &tokens.refresh_token).await?;
        tracing::debug!(user_id = %user_id, "Refresh token rotated");

        Ok(tokens)
    }

    async fn logout(&self, user_id: &UserId) -> Result<(), AuthError> {
        if self.revoke_current(user_id).await?.is_some() {
            self.sessions
                .delete(&refresh_token_key(&user_id.to_string()))
                .await?;
        }

        tracing::info!(user_id = %user_id, "User logged out");
        Ok(())
    }
}
