use std::sync::Arc;

use async_trait::async_trait;
use auth::Authenticator;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::access::errors::Unauthenticated;
use crate::domain::access::models::AuthenticatedIdentity;
use crate::domain::user::models::Username;
use crate::domain::user::ports::CredentialStore;

const BEARER_SCHEME: &str = "Bearer";

/// Port for resolving the identity behind a request.
#[async_trait]
pub trait RequestGatePort: Send + Sync + 'static {
    /// Resolve the identity carried by an `Authorization` header value.
    ///
    /// # Arguments
    /// * `authorization` - Raw header value, if the request had one
    /// * `now` - Instant the token expiry is checked against
    ///
    /// # Errors
    /// * `MissingCredentials` - No header
    /// * `MalformedHeader` - Not of the form `Bearer <token>`
    /// * `InvalidToken` - Signature, format, or expiry check failed
    /// * `UnknownSubject` - Token is valid but names a user that does not exist
    /// * `InactiveAccount` - User exists but may not sign in
    /// * `StoreUnavailable` - Credential store lookup failed
    async fn authenticate(
        &self,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedIdentity, Unauthenticated>;
}

/// Verifies bearer tokens and re-reads the subject from the credential store.
pub struct RequestGate<S>
where
    S: CredentialStore,
{
    store: Arc<S>,
    authenticator: Arc<Authenticator>,
}

impl<S> RequestGate<S>
where
    S: CredentialStore,
{
    pub fn new(store: Arc<S>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            store,
            authenticator,
        }
    }
}

#[async_trait]
impl<S> RequestGatePort for RequestGate<S>
where
    S: CredentialStore,
{
    async fn authenticate(
        &self,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedIdentity, Unauthenticated> {
        let header = authorization.ok_or(Unauthenticated::MissingCredentials)?;
        let token = bearer_token(header)?;

        let subject = self.authenticator.validate_token(token, now)?;
        let username = match Username::new(subject.clone()) {
            Ok(username) => username,
            Err(_) => return Err(Unauthenticated::UnknownSubject(subject)),
        };

        let user = self
            .store
            .find_by_username(&username)
            .await
            .map_err(|e| Unauthenticated::StoreUnavailable(e.to_string()))?
            .ok_or(Unauthenticated::UnknownSubject(subject))?;

        if !user.account.is_active() {
            return Err(Unauthenticated::InactiveAccount);
        }

        Ok(AuthenticatedIdentity::from(&user))
    }
}

/// Extract the token from a `Bearer <token>` header value.
///
/// The scheme is case-insensitive; the token must be non-empty.
pub fn bearer_token(header: &str) -> Result<&str, Unauthenticated> {
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(Unauthenticated::MalformedHeader)?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) || token.is_empty() {
        return Err(Unauthenticated::MalformedHeader);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use auth::JwtError;
    use chrono::Duration;

    use super::*;
    use crate::domain::user::models::AccountStatus;
    use crate::domain::user::models::Role;
    use crate::domain::user::service::tests::stored_user;
    use crate::domain::user::service::tests::test_authenticator;
    use crate::outbound::repositories::InMemoryCredentialStore;

    async fn gate_with_user(
        username: &str,
    ) -> (
        RequestGate<InMemoryCredentialStore>,
        Arc<InMemoryCredentialStore>,
        Arc<Authenticator>,
    ) {
        let authenticator = test_authenticator();
        let store = Arc::new(InMemoryCredentialStore::new());
        store
            .save(stored_user(&authenticator, username, "Secr3t!"))
            .await
            .unwrap();

        let gate = RequestGate::new(Arc::clone(&store), Arc::clone(&authenticator));
        (gate, store, authenticator)
    }

    fn bearer(authenticator: &Authenticator, subject: &str) -> String {
        let issued = authenticator.issue_token(subject, Utc::now()).unwrap();
        format!("Bearer {}", issued.token)
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Ok("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc"), Ok("abc"));
        assert_eq!(bearer_token("BEARER abc"), Ok("abc"));
        assert_eq!(bearer_token("Bearer "), Err(Unauthenticated::MalformedHeader));
        assert_eq!(bearer_token("Bearer"), Err(Unauthenticated::MalformedHeader));
        assert_eq!(bearer_token("Basic abc"), Err(Unauthenticated::MalformedHeader));
        assert_eq!(bearer_token("abc"), Err(Unauthenticated::MalformedHeader));
    }

    #[tokio::test]
    async fn test_valid_token_resolves_identity() {
        let (gate, _, authenticator) = gate_with_user("ana").await;

        let identity = gate
            .authenticate(Some(&bearer(&authenticator, "ana")), Utc::now())
            .await
            .expect("Identity should resolve");

        assert_eq!(identity.username.as_str(), "ana");
        assert_eq!(identity.role, Role::User);
    }

    #[tokio::test]
    async fn test_missing_and_malformed_headers() {
        let (gate, _, _) = gate_with_user("ana").await;

        assert_eq!(
            gate.authenticate(None, Utc::now()).await,
            Err(Unauthenticated::MissingCredentials)
        );
        assert_eq!(
            gate.authenticate(Some("Token abc"), Utc::now()).await,
            Err(Unauthenticated::MalformedHeader)
        );
        assert!(matches!(
            gate.authenticate(Some("Bearer not-a-jwt"), Utc::now()).await,
            Err(Unauthenticated::InvalidToken(JwtError::Malformed(_)))
        ));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let (gate, _, authenticator) = gate_with_user("ana").await;

        let issued = authenticator
            .issue_token("ana", Utc::now() - Duration::hours(25))
            .unwrap();

        assert_eq!(
            gate.authenticate(Some(&format!("Bearer {}", issued.token)), Utc::now())
                .await,
            Err(Unauthenticated::InvalidToken(JwtError::TokenExpired))
        );
    }

    #[tokio::test]
    async fn test_token_from_other_secret_rejected() {
        let (gate, _, _) = gate_with_user("ana").await;
        let other = Authenticator::new(
            b"a-completely-different-secret-of-32-bytes!!",
            Duration::hours(1),
        )
        .unwrap();

        assert_eq!(
            gate.authenticate(Some(&bearer(&other, "ana")), Utc::now()).await,
            Err(Unauthenticated::InvalidToken(JwtError::InvalidSignature))
        );
    }

    #[tokio::test]
    async fn test_unknown_subject_carries_verified_name() {
        let (gate, _, authenticator) = gate_with_user("ana").await;

        assert_eq!(
            gate.authenticate(Some(&bearer(&authenticator, "ghost")), Utc::now()).await,
            Err(Unauthenticated::UnknownSubject("ghost".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unknown_subject_requires_valid_token() {
        let (gate, _, _) = gate_with_user("ana").await;
        let other = Authenticator::new(
            b"a-completely-different-secret-of-32-bytes!!",
            Duration::hours(1),
        )
        .unwrap();

        assert_eq!(
            gate.authenticate(Some(&bearer(&other, "ghost")), Utc::now()).await,
            Err(Unauthenticated::InvalidToken(JwtError::InvalidSignature))
        );
    }

    #[tokio::test]
    async fn test_deactivated_account_rejected_immediately() {
        let (gate, store, authenticator) = gate_with_user("ana").await;
        let header = bearer(&authenticator, "ana");
        assert!(gate.authenticate(Some(&header), Utc::now()).await.is_ok());

        let username = Username::new("ana".to_string()).unwrap();
        store
            .set_account_status(
                &username,
                AccountStatus {
                    enabled: false,
                    ..AccountStatus::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(
            gate.authenticate(Some(&header), Utc::now()).await,
            Err(Unauthenticated::InactiveAccount)
        );
    }

    #[tokio::test]
    async fn test_role_change_visible_on_next_request() {
        let (gate, store, authenticator) = gate_with_user("ana").await;
        let header = bearer(&authenticator, "ana");

        let username = Username::new("ana".to_string()).unwrap();
        store.update_role(&username, Role::Admin).await.unwrap();

        let identity = gate.authenticate(Some(&header), Utc::now()).await.unwrap();
        assert_eq!(identity.role, Role::Admin);
    }
}
