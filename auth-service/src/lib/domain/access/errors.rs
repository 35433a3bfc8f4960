use auth::JwtError;
use thiserror::Error;

use crate::domain::user::models::Role;

/// Why a request carries no usable identity.
///
/// Only ever logged. Callers see a uniform 401, except that a verified
/// token for a deleted subject lets the profile lookup report 404.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Unauthenticated {
    #[error("No Authorization header")]
    MissingCredentials,

    #[error("Authorization header is not a bearer token")]
    MalformedHeader,

    #[error("Token rejected: {0}")]
    InvalidToken(#[from] JwtError),

    #[error("Token subject {0} does not exist")]
    UnknownSubject(String),

    #[error("Account is not active")]
    InactiveAccount,

    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Outcome of a failed authorization decision.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Role {actual} is not permitted")]
    Forbidden { actual: Role },
}
