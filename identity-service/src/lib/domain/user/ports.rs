use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::user::errors::UserError;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserResponse;

/// Port for user lookup operations exposed to the HTTP layer.
#[async_trait]
pub trait UserServicePort: Send + Sync + 'static {
    /// Retrieve the public projection of a user, cache first.
    ///
    /// # Arguments
    /// * `id` - Raw user identifier as received from the caller
    ///
    /// # Errors
    /// * `InvalidUserId` - `id` is not a UUID; no collaborator is touched
    /// * `NotFound` - User does not exist or is soft-deleted
    /// * `DatabaseError` - Directory lookup failed
    async fn get_user(&self, id: &str) -> Result<UserResponse, UserError>;
}

/// Persistence operations for the user directory.
///
/// Every read ignores soft-deleted rows.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist new user to storage.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, user: User) -> Result<User, UserError>;

    /// Retrieve user by identifier.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;

    /// Retrieve user by email address.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError>;

    /// Number of users that are not soft-deleted.
    async fn count_active(&self) -> Result<i64, UserError>;

    /// Number of users created at or after `since`.
    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64, UserError>;
}
