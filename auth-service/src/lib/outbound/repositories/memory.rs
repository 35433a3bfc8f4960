use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::user::models::AccountStatus;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Role;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;
use crate::domain::user::ports::CredentialStore;
use crate::user::errors::AuthError;

/// Process-local credential store.
///
/// Used when no database is configured and by the test suites. Contents are
/// lost on restart.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn update_role(&self, username: &Username, role: Role) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        let user = users
            .values_mut()
            .find(|u| &u.username == username)
            .ok_or_else(|| AuthError::NotFound(username.to_string()))?;

        user.role = role;
        Ok(())
    }

    pub async fn set_account_status(
        &self,
        username: &Username,
        status: AccountStatus,
    ) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        let user = users
            .values_mut()
            .find(|u| &u.username == username)
            .ok_or_else(|| AuthError::NotFound(username.to_string()))?;

        user.account = status;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, AuthError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| &u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, AuthError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| &u.email == email).cloned())
    }

    async fn exists_by_username(&self, username: &Username) -> Result<bool, AuthError> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| &u.username == username))
    }

    async fn exists_by_email(&self, email: &EmailAddress) -> Result<bool, AuthError> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| &u.email == email))
    }

    async fn save(&self, user: User) -> Result<User, AuthError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.username == user.username) {
            return Err(AuthError::UsernameTaken(user.username.to_string()));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(AuthError::EmailTaken(user.email.to_string()));
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_last_login(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| AuthError::NotFound(id.to_string()))?;

        user.last_login = Some(at);
        Ok(())
    }
}
