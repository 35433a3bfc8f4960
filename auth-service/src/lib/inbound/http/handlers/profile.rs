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
use crate::domain::access::models::DeletedSubject;
use crate::domain::user::errors::AuthError;
use crate::domain::user::models::Role;
use crate::domain::user::models::User;
use crate::inbound::http::router::AppState;

/// Profile of the signed-in user. Open to every role.
///
/// A valid token whose subject has since been deleted gets 404.
pub async fn profile(
    State(state): State<AppState>,
    identity: Option<Extension<AuthenticatedIdentity>>,
    deleted: Option<Extension<DeletedSubject>>,
) -> Result<ApiSuccess<ProfileResponseData>, ApiError> {
    if let (None, Some(Extension(DeletedSubject(subject)))) = (&identity, deleted) {
        return Err(ApiError::from(AuthError::NotFound(subject)));
    }

    let identity = authorize(identity.as_deref(), Role::ALL)?;

    state
        .auth_service
        .find_by_username(&identity.username)
        .await
        .map_err(ApiError::from)
        .map(|ref user| ApiSuccess::new(StatusCode::OK, user.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponseData {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for ProfileResponseData {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.as_str().to_string(),
            email: user.email.as_str().to_string(),
            role: user.role,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}
