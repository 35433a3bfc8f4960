use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::user::models::AccountStatus;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Role;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;
use crate::domain::user::ports::CredentialStore;
use crate::user::errors::AuthError;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, enabled, \
    account_non_expired, account_non_locked, credentials_non_expired, created_at, last_login";

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    enabled: bool,
    account_non_expired: bool,
    account_non_locked: bool,
    credentials_non_expired: bool,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = AuthError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId(r.id),
            username: Username::new(r.username)?,
            email: EmailAddress::new(r.email)?,
            password_hash: r.password_hash,
            role: r
                .role
                .parse::<Role>()
                .map_err(|e| AuthError::DatabaseError(e.to_string()))?,
            account: AccountStatus {
                enabled: r.enabled,
                account_non_expired: r.account_non_expired,
                account_non_locked: r.account_non_locked,
                credentials_non_expired: r.credentials_non_expired,
            },
            created_at: r.created_at,
            last_login: r.last_login,
        })
    }
}

/// PostgreSQL-backed credential store.
pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Change a user's role. Used for operator tooling and admin bootstrap.
    pub async fn update_role(&self, username: &Username, role: Role) -> Result<(), AuthError> {
        let result = sqlx::query("UPDATE users SET role = $2 WHERE username = $1")
            .bind(username.as_str())
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound(username.to_string()));
        }

        Ok(())
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>, AuthError> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        row.map(User::try_from).transpose()
    }

    async fn exists(&self, column: &str, value: &str) -> Result<bool, AuthError> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM users WHERE {} = $1)", column);

        sqlx::query_scalar::<_, bool>(&sql)
            .bind(value)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, AuthError> {
        self.find_one("username", username.as_str()).await
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, AuthError> {
        self.find_one("email", email.as_str()).await
    }

    async fn exists_by_username(&self, username: &Username) -> Result<bool, AuthError> {
        self.exists("username", username.as_str()).await
    }

    async fn exists_by_email(&self, email: &EmailAddress) -> Result<bool, AuthError> {
        self.exists("email", email.as_str()).await
    }

    async fn save(&self, user: User) -> Result<User, AuthError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, password_hash, role, enabled,
                account_non_expired, account_non_locked, credentials_non_expired,
                created_at, last_login
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.id.0)
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.account.enabled)
        .bind(user.account.account_non_expired)
        .bind(user.account.account_non_locked)
        .bind(user.account.credentials_non_expired)
        .bind(user.created_at)
        .bind(user.last_login)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    if db_err.constraint() == Some("users_username_key") {
                        return AuthError::UsernameTaken(user.username.to_string());
                    }
                    if db_err.constraint() == Some("users_email_key") {
                        return AuthError::EmailTaken(user.email.to_string());
                    }
                }
            }
            AuthError::DatabaseError(e.to_string())
        })?;

        Ok(user)
    }

    async fn update_last_login(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), AuthError> {
        let result = sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id.0)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound(id.to_string()));
        }

        Ok(())
    }
}
