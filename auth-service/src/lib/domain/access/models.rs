use crate::domain::user::models::Role;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;

/// Identity resolved for the current request.
///
/// Built from the credential store on every request, so role changes and
/// account deactivation take effect immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub user_id: UserId,
    pub username: Username,
    pub role: Role,
}

/// Subject of a correctly signed, unexpired token that has no stored account.
///
/// Grants no role; role-gated operations still treat the request as
/// unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedSubject(pub String);

impl From<&User> for AuthenticatedIdentity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}
