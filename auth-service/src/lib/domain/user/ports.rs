use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::LoginOutcome;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;
use crate::user::errors::AuthError;

/// Port for authentication domain service operations.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Verify credentials and issue an access token.
    ///
    /// # Arguments
    /// * `command` - Raw username and plaintext password
    ///
    /// # Returns
    /// Issued token, its lifetime, and the signed-in user
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown user, inactive account, or wrong password
    /// * `DatabaseError` - Credential store unavailable
    /// * `Token` - Token signing failed
    async fn login(&self, command: LoginCommand) -> Result<LoginOutcome, AuthError>;

    /// Register a new user with validated credentials.
    ///
    /// # Arguments
    /// * `command` - Validated command containing username, email, and password
    ///
    /// # Returns
    /// Created user entity
    ///
    /// # Errors
    /// * `UsernameTaken` - Username is already taken
    /// * `EmailTaken` - Email is already registered
    /// * `Password` - Password hashing failed
    /// * `DatabaseError` - Database operation failed
    async fn register(&self, command: RegisterCommand) -> Result<User, AuthError>;

    /// Retrieve user by unique username.
    ///
    /// # Errors
    /// * `NotFound` - No user with this username
    /// * `DatabaseError` - Database operation failed
    async fn find_by_username(&self, username: &Username) -> Result<User, AuthError>;

    /// Whether a username is already registered.
    async fn username_exists(&self, username: &Username) -> Result<bool, AuthError>;

    /// Whether an email address is already registered.
    async fn email_exists(&self, email: &EmailAddress) -> Result<bool, AuthError>;
}

/// Persistence operations for user credentials.
///
/// Implementations own uniqueness of usernames and emails: `save` must fail
/// with `UsernameTaken` / `EmailTaken` on a conflicting insert even when
/// callers checked beforehand.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Retrieve user by username.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, AuthError>;

    /// Retrieve user by email address.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, AuthError>;

    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn exists_by_username(&self, username: &Username) -> Result<bool, AuthError>;

    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn exists_by_email(&self, email: &EmailAddress) -> Result<bool, AuthError>;

    /// Persist new user to storage.
    ///
    /// # Returns
    /// Created user entity
    ///
    /// # Errors
    /// * `UsernameTaken` - Username is already taken
    /// * `EmailTaken` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn save(&self, user: User) -> Result<User, AuthError>;

    /// Record a successful login.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn update_last_login(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), AuthError>;
}
