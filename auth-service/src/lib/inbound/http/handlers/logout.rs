use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::access::authorization::authorize;
use crate::domain::access::models::AuthenticatedIdentity;
use crate::domain::user::models::Role;

/// Tokens are stateless: logout only tells the client to discard its token.
pub async fn logout(
    identity: Option<Extension<AuthenticatedIdentity>>,
) -> Result<ApiSuccess<LogoutResponseData>, ApiError> {
    let identity = authorize(identity.as_deref(), Role::ALL)?;
    tracing::info!(username = %identity.username, "User logged out");

    Ok(ApiSuccess::new(
        StatusCode::OK,
        LogoutResponseData {
            message: "Logout successful".to_string(),
            instruction: "Remove the JWT token from client storage".to_string(),
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogoutResponseData {
    pub message: String,
    pub instruction: String,
}
