use crate::domain::access::errors::AccessDenied;
use crate::domain::access::models::AuthenticatedIdentity;
use crate::domain::user::models::Role;

/// Decide whether a request may run an operation restricted to `accepted`.
///
/// An empty `accepted` set admits any authenticated identity.
///
/// # Errors
/// * `Unauthenticated` - No identity was resolved for the request
/// * `Forbidden` - The identity's role is not in `accepted`
pub fn authorize<'a>(
    identity: Option<&'a AuthenticatedIdentity>,
    accepted: &[Role],
) -> Result<&'a AuthenticatedIdentity, AccessDenied> {
    let identity = identity.ok_or(AccessDenied::Unauthenticated)?;

    if accepted.is_empty() || accepted.contains(&identity.role) {
        Ok(identity)
    } else {
        Err(AccessDenied::Forbidden {
            actual: identity.role,
        })
    }
}

/// Whether `path` falls under one of the public prefixes.
///
/// Prefixes match on segment boundaries: `/auth/login` covers
/// `/auth/login` and `/auth/login/x` but not `/auth/loginx`.
pub fn is_public_path(path: &str, public_paths: &[String]) -> bool {
    public_paths.iter().any(|prefix| {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return true;
        }
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    })
}
