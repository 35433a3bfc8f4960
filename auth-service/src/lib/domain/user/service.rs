use std::sync::Arc;

use async_trait::async_trait;
use auth::Authenticator;
use chrono::Utc;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::LoginOutcome;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::Username;
use crate::user::errors::AuthError;
use crate::user::ports::AuthServicePort;
use crate::user::ports::CredentialStore;

/// Domain service implementation for authentication operations.
///
/// Concrete implementation of AuthServicePort with dependency injection.
pub struct AuthService<S>
where
    S: CredentialStore,
{
    store: Arc<S>,
    authenticator: Arc<Authenticator>,
}

impl<S> AuthService<S>
where
    S: CredentialStore,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `store` - Credential persistence implementation
    /// * `authenticator` - Password hashing and token issuing
    pub fn new(store: Arc<S>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            store,
            authenticator,
        }
    }
}

#[async_trait]
impl<S> AuthServicePort for AuthService<S>
where
    S: CredentialStore,
{
    async fn login(&self, command: LoginCommand) -> Result<LoginOutcome, AuthError> {
        let user = match Username::new(command.username.clone()) {
            Ok(username) => self.store.find_by_username(&username).await?,
            Err(_) => None,
        };

        let user = match user {
            Some(user) if !user.account.is_active() => {
                tracing::debug!(user_id = %user.id, "Login attempt for inactive account");
                None
            }
            other => other,
        };

        let now = Utc::now();
        let stored_hash = user.as_ref().map(|u| u.password_hash.as_str());
        let result =
            self.authenticator
                .authenticate(&command.username, &command.password, stored_hash, now);

        let (token, mut user) = match (result, user) {
            (Ok(token), Some(user)) => (token, user),
            (Err(auth::AuthenticationError::InvalidCredentials), _) | (Ok(_), None) => {
                tracing::info!(username = %command.username, "Login rejected");
                return Err(AuthError::InvalidCredentials);
            }
            (Err(e), _) => return Err(AuthError::from(e)),
        };

        match self.store.update_last_login(&user.id, now).await {
            Ok(()) => user.last_login = Some(now),
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to record last login");
            }
        }

        tracing::info!(user_id = %user.id, username = %user.username, "User logged in");

        Ok(LoginOutcome {
            token,
            expires_in_ms: self.authenticator.token_ttl().num_milliseconds(),
            user,
        })
    }

    async fn register(&self, command: RegisterCommand) -> Result<User, AuthError> {
        if self.store.exists_by_username(&command.username).await? {
            return Err(AuthError::UsernameTaken(command.username.to_string()));
        }

        if self.store.exists_by_email(&command.email).await? {
            return Err(AuthError::EmailTaken(command.email.to_string()));
        }

        let password_hash = self
            .authenticator
            .hash_password(command.password.expose())
            .map_err(|e| AuthError::Password(e.to_string()))?;

        let user = User::register(command.username, command.email, password_hash, Utc::now());
        let created_user = self.store.save(user).await?;

        tracing::info!(
            user_id = %created_user.id,
            username = %created_user.username,
            "User registered"
        );

        Ok(created_user)
    }

    async fn find_by_username(&self, username: &Username) -> Result<User, AuthError> {
        self.store
            .find_by_username(username)
            .await?
            .ok_or_else(|| AuthError::NotFound(username.to_string()))
    }

    async fn username_exists(&self, username: &Username) -> Result<bool, AuthError> {
        self.store.exists_by_username(username).await
    }

    async fn email_exists(&self, email: &EmailAddress) -> Result<bool, AuthError> {
        self.store.exists_by_email(email).await
    }
}
