use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::access::authorization::authorize;
use crate::domain::access::models::AuthenticatedIdentity;
use crate::domain::user::models::Role;
use crate::domain::user::models::User;
use crate::domain::user::models::Username;
use crate::inbound::http::router::AppState;

/// Administrative lookup of any user by username.
pub async fn get_user(
    State(state): State<AppState>,
    identity: Option<Extension<AuthenticatedIdentity>>,
    Path(username): Path<String>,
) -> Result<ApiSuccess<GetUserResponseData>, ApiError> {
    let admin = authorize(identity.as_deref(), &[Role::Admin])?;

    let username = Username::new(username).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    tracing::debug!(admin = %admin.username, target = %username, "Admin user lookup");

    state
        .auth_service
        .find_by_username(&username)
        .await
        .map_err(ApiError::from)
        .map(|ref user| ApiSuccess::new(StatusCode::OK, user.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserResponseData {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub enabled: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for GetUserResponseData {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.as_str().to_string(),
            email: user.email.as_str().to_string(),
            role: user.role,
            enabled: user.account.enabled,
            active: user.account.is_active(),
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}
